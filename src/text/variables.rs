use crate::{
    foundation::core::BlockId,
    foundation::error::ConvertResult,
    scene::engine::SceneEngine,
};

/// Characters replaced by [`escape_text_variables`], in ascending position order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EscapedVariables {
    replaced: Vec<(usize, char)>,
}

impl EscapedVariables {
    /// Replaced `(position, original char)` pairs.
    pub fn replaced(&self) -> &[(usize, char)] {
        &self.replaced
    }

    /// Return `true` when nothing was escaped.
    pub fn is_empty(&self) -> bool {
        self.replaced.is_empty()
    }
}

/// Character positions of the `{{` and `}}` delimiters of every `{{...}}` token.
///
/// Tokens are matched left to right; a token ends at the first `}}` after its opening `{{`.
pub fn variable_delimiters(text: &str) -> Vec<usize> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i + 1 < chars.len() {
        if chars[i] == '{' && chars[i + 1] == '{' {
            let close = (i + 2..chars.len().saturating_sub(1))
                .find(|&j| chars[j] == '}' && chars[j + 1] == '}');
            let Some(j) = close else {
                break;
            };
            out.extend([i, i + 1, j, j + 1]);
            i = j + 2;
        } else {
            i += 1;
        }
    }
    out
}

/// Replace the delimiters of `{{...}}` tokens in the block text with `placeholder`.
///
/// The engine would otherwise treat those tokens as template variables while ranged styles are
/// applied. The replacement keeps the text length, so style ranges stay valid.
pub fn escape_text_variables(
    engine: &mut dyn SceneEngine,
    block: BlockId,
    placeholder: char,
) -> ConvertResult<EscapedVariables> {
    let text = engine.text(block)?;
    let positions = variable_delimiters(&text);
    if positions.is_empty() {
        return Ok(EscapedVariables::default());
    }
    let chars: Vec<char> = text.chars().collect();
    let mut buf = [0u8; 4];
    let placeholder = placeholder.encode_utf8(&mut buf);
    let mut replaced = Vec::with_capacity(positions.len());
    for pos in positions {
        engine.replace_text(block, pos..pos + 1, placeholder)?;
        replaced.push((pos, chars[pos]));
    }
    Ok(EscapedVariables { replaced })
}

/// Put back the characters recorded by [`escape_text_variables`], last to first.
pub fn restore_text_variables(
    engine: &mut dyn SceneEngine,
    block: BlockId,
    escaped: &EscapedVariables,
) -> ConvertResult<()> {
    let mut buf = [0u8; 4];
    for &(pos, ch) in escaped.replaced.iter().rev() {
        engine.replace_text(block, pos..pos + 1, ch.encode_utf8(&mut buf))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/text/variables.rs"]
mod tests;
