use crate::Wrapping;

/// Splits a GraphQL type reference such as `[Int!]!` into its named type and wrapping.
pub fn parse_type(ty: &str) -> Option<(&str, Wrapping)> {
    let ty = ty.trim();
    let (ty, required) = match ty.strip_suffix('!') {
        Some(ty) => (ty.trim_end(), true),
        None => (ty, false),
    };

    if let Some(inner) = ty.strip_prefix('[').and_then(|ty| ty.strip_suffix(']')) {
        let (name, wrapping) = parse_type(inner)?;
        let wrapping = if required {
            wrapping.list_non_null()
        } else {
            wrapping.list()
        };
        return Some((name, wrapping));
    }

    let is_name = ty
        .chars()
        .enumerate()
        .all(|(i, c)| c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit()));
    if ty.is_empty() || !is_name {
        return None;
    }

    Some((ty, Wrapping::new(required)))
}
