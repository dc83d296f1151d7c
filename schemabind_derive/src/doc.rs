// Copyright 2025 Oxide Computer Company

//! Doc comments as descriptions.

/// Joins the doc comments in `attrs` into one description, `None` if there
/// are none.
pub(crate) fn extract_doc_from_attrs(attrs: &[syn::Attribute]) -> Option<String> {
    let mut lines = attrs.iter().flat_map(|attr| {
        if let syn::Meta::NameValue(nv) = &attr.meta {
            if nv.path.is_ident("doc") {
                if let syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(s), ..
                }) = &nv.value
                {
                    return normalize_comment_string(s.value());
                }
            }
        }
        Vec::new()
    });

    // Skip initial blank lines.
    let first = loop {
        match lines.next() {
            Some(s) if s.is_empty() => (),
            next => break next,
        }
    }?;

    let description = lines
        .fold(first, |acc, comment| {
            if acc.ends_with('-') || acc.ends_with('\n') || acc.is_empty() {
                // Continuation lines and newlines.
                format!("{}{}", acc, comment)
            } else if comment.is_empty() {
                // Blank comments separate paragraphs.
                format!("{}\n", acc)
            } else {
                format!("{} {}", acc, comment)
            }
        })
        .trim_end()
        .to_string();
    Some(description)
}

fn normalize_comment_string(s: String) -> Vec<String> {
    s.split('\n')
        .enumerate()
        .map(|(idx, s)| {
            // `///` comments are single lines; only block comments carry
            // leading stars to strip.
            if idx == 0 {
                s.trim()
            } else {
                let trimmed = s.trim();
                trimmed.strip_prefix("* ").unwrap_or_else(|| {
                    trimmed.strip_prefix('*').unwrap_or(trimmed)
                })
            }
        })
        .map(ToString::to_string)
        .collect()
}
