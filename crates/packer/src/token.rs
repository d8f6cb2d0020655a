//! Token estimation.
//!
//! A turn's cost is the token length of its full rendering (never cut, so the
//! response is always counted) plus [`IMAGE_TOKEN_COST`] per attached image.

use promptpack_core::{Encoder, IMAGE_TOKEN_COST, Result, Turn};
use promptpack_template::{Bindings, render};

/// Render `vars` through `template` without cutting and count the tokens.
///
/// Encoding failures are logged before they propagate.
pub fn estimate_tokens(template: &str, vars: Bindings<'_>, encoder: &dyn Encoder) -> Result<usize> {
    let rendered = render(template, vars, false)?;

    let tokens = encoder.encode(&rendered).inspect_err(|e| {
        tracing::error!(error = %e, "failed to encode prompt");
    })?;

    Ok(tokens.len())
}

/// Estimated cost of a whole turn, images included.
pub fn turn_tokens(template: &str, turn: &Turn, encoder: &dyn Encoder) -> Result<usize> {
    let text = estimate_tokens(template, Bindings::from(turn), encoder)?;
    Ok(text + turn.image_tokens())
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptpack_core::{EncodingError, Error, HeuristicEncoder, Image};

    const TEMPLATE: &str = "{{ .System }}{{ .Prompt }}";

    fn bytes() -> HeuristicEncoder {
        HeuristicEncoder::new(1)
    }

    #[test]
    fn counts_the_uncut_rendering() {
        let vars = Bindings {
            system: "ab",
            prompt: "cd",
            response: "ef",
        };
        // The appended marker renders the response too.
        assert_eq!(estimate_tokens(TEMPLATE, vars, &bytes()).unwrap(), 6);
    }

    #[test]
    fn images_add_a_flat_surcharge() {
        let turn = Turn {
            prompt: Some("hi".into()),
            images: vec![
                Image { id: 0, data: vec![1] },
                Image { id: 1, data: vec![2] },
            ],
            ..Turn::default()
        };
        assert_eq!(
            turn_tokens(TEMPLATE, &turn, &bytes()).unwrap(),
            2 + 2 * IMAGE_TOKEN_COST
        );
    }

    #[test]
    fn encoder_failures_propagate() {
        let failing = |_: &str| -> std::result::Result<Vec<u32>, EncodingError> {
            Err(EncodingError::new("tokenizer offline"))
        };
        let err = estimate_tokens(TEMPLATE, Bindings::default(), &failing).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn template_failures_propagate() {
        let err = estimate_tokens("{{ end }}", Bindings::default(), &bytes()).unwrap_err();
        assert!(matches!(err, Error::Template(_)));
    }
}
