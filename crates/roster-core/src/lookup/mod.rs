//! Visual-code lookup: payload format, resolution and the scan loop.

mod payload;
mod resolver;
mod scanner;

pub use payload::{encode, extract_identifier, parse, LookupPayload};
pub use resolver::{LookupOutcome, LookupResolver};
pub use scanner::{FrameDecoder, ScanFeed, ScanSession};

use crate::models::Profile;

/// Edge length, in pixels, of a rendered profile code.
pub const CODE_IMAGE_SIZE: u32 = 300;

/// Capability that turns text into a scannable image.
pub trait CodeRenderer {
    type Image;
    type Error: std::fmt::Display;

    fn encode_to_image(&self, text: &str, width: u32, height: u32)
        -> Result<Self::Image, Self::Error>;
}

/// Render the lookup code for `profile` as a square [`CODE_IMAGE_SIZE`] image.
pub fn render_profile_code<C: CodeRenderer>(
    renderer: &C,
    profile: &Profile,
) -> Result<C::Image, C::Error> {
    renderer
        .encode_to_image(&encode(profile), CODE_IMAGE_SIZE, CODE_IMAGE_SIZE)
        .inspect_err(|error| tracing::warn!("Failed to render profile code: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::manual_profile;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingRenderer {
        calls: RefCell<Vec<(String, u32, u32)>>,
    }

    impl CodeRenderer for RecordingRenderer {
        type Image = usize;
        type Error = String;

        fn encode_to_image(&self, text: &str, width: u32, height: u32) -> Result<usize, String> {
            if text.is_empty() {
                return Err("nothing to encode".to_string());
            }
            self.calls.borrow_mut().push((text.to_string(), width, height));
            Ok(text.len())
        }
    }

    #[test]
    fn renders_payload_at_fixed_size() {
        let renderer = RecordingRenderer::default();
        let profile = manual_profile("Ada", "Lovelace", "ada@example.com");

        let image = render_profile_code(&renderer, &profile).unwrap();

        let calls = renderer.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], (encode(&profile), 300, 300));
        assert_eq!(image, calls[0].0.len());
        assert_eq!(extract_identifier(&calls[0].0), Some(profile.id));
    }
}
