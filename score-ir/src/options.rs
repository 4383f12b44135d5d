//! Per-voice construction settings.

use serde::{Deserialize, Serialize};

/// Settings, copied into every [crate::dom::Voice] on creation.
///
/// Missing fields fall back to defaults on deserialization.
///
/// # Example
///
/// ```
/// use score_ir::IrOptions;
/// let options = IrOptions {
///     min_full_bar_rests_to_compress: 4,
///     ..Default::default()
/// };
/// assert!(options.compress_full_bar_rests);
/// assert!(options.infer_repeat_starts);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IrOptions {
    /// Wrap runs of consecutive full-bar rests into multiple rests
    /// when the voice is finalized.
    pub compress_full_bar_rests: bool,
    pub min_full_bar_rests_to_compress: usize,
    /// If false, a repeat end or an ending start without an open repeat
    /// is reported, and the material stays non-repeated.
    pub infer_repeat_starts: bool,
    /// Default replicas policy of [crate::dom::Voice::browse].
    pub expand_measure_repeat_replicas: bool,
}
impl Default for IrOptions {
    fn default() -> Self {
        Self {
            compress_full_bar_rests: true,
            min_full_bar_rests_to_compress: 2,
            infer_repeat_starts: true,
            expand_measure_repeat_replicas: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::IrOptions;

    #[test]
    fn partial_options() {
        let options: IrOptions = serde_json::from_str(
            r#"{"compress_full_bar_rests": false}"#,
        )
        .unwrap();
        assert_eq!(
            options,
            IrOptions {
                compress_full_bar_rests: false,
                ..Default::default()
            }
        );
        let text = serde_json::to_string(&options).unwrap();
        let back: IrOptions = serde_json::from_str(&text).unwrap();
        assert_eq!(back, options);
    }
}
