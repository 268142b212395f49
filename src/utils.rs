use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Issue,
    Series,
}

/// Non-empty path segments of a URL, query and fragment excluded.
pub fn path_segments(url: &Url) -> Vec<&str> {
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

/// An issue URL has at least three path segments and the last one mentions "issue".
pub fn classify(url: &Url) -> TargetKind {
    let segments = path_segments(url);
    match segments.last() {
        Some(last) if segments.len() >= 3 && last.to_lowercase().contains("issue") => {
            TargetKind::Issue
        }
        _ => TargetKind::Series,
    }
}

/// Appends the forced reader parameters, keeping any existing query intact.
///
/// A parameter is only left out when the exact `key=value` pair is already
/// there; a conflicting value for the same key still gets the forced pair.
pub fn force_query(url: &Url, params: &[(String, String)]) -> Url {
    let present: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let missing: Vec<&(String, String)> = params
        .iter()
        .filter(|pair| !present.contains(pair))
        .collect();

    let mut forced = url.clone();
    if !missing.is_empty() {
        let mut pairs = forced.query_pairs_mut();
        for (key, value) in missing {
            pairs.append_pair(key, value);
        }
    }
    forced
}
