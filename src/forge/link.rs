//! `Link` header pagination.

/// Extract the `rel="next"` target from a `Link` header value.
pub fn next_link(header: &str) -> Option<String> {
    header.split(',').find_map(|entry| {
        let mut params = entry.split(';');
        let target = params.next()?.trim();
        let url = target.strip_prefix('<')?.strip_suffix('>')?;
        let is_next = params.any(|param| {
            let param = param.trim();
            param == r#"rel="next""# || param == "rel=next"
        });
        is_next.then(|| url.to_string())
    })
}
