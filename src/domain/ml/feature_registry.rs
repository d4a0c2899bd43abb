/// Display names for the auxiliary signals, in observation order.
/// Deployments with a larger arity fall back to `aux_<index>`.
pub const AUXILIARY_SIGNAL_NAMES: &[&str] = &["usd_try", "news_sentiment"];

pub fn signal_name(index: usize) -> String {
    AUXILIARY_SIGNAL_NAMES
        .get(index)
        .map(|name| name.to_string())
        .unwrap_or_else(|| format!("aux_{}", index))
}

/// Picks the auxiliary values named by `feature_spec`, in spec order.
/// Returns `None` if any index is out of range.
pub fn select_features(auxiliary_values: &[f64], feature_spec: &[usize]) -> Option<Vec<f64>> {
    feature_spec
        .iter()
        .map(|&idx| auxiliary_values.get(idx).copied())
        .collect()
}
