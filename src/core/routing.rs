use crate::domain::model::Fragment;
use std::collections::HashSet;

/// 收集所有片段的 identifier；沒有片段時回傳空集合
pub fn all_identifiers(fragments: Option<&[Fragment]>) -> HashSet<String> {
    fragments
        .map(|fragments| {
            fragments
                .iter()
                .flat_map(|f| f.identifiers.iter())
                .filter(|id| !id.is_empty())
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Typical `should_process` body: any overlap with the identifiers a knot supports.
pub fn supports_any<S: AsRef<str>>(identifiers: &HashSet<String>, supported: &[S]) -> bool {
    supported
        .iter()
        .any(|s| !s.as_ref().is_empty() && identifiers.contains(s.as_ref()))
}

pub fn fragment_matches<S: AsRef<str>>(fragment: &Fragment, supported: &[S]) -> bool {
    supported
        .iter()
        .any(|s| !s.as_ref().is_empty() && fragment.has_identifier(s.as_ref()))
}
