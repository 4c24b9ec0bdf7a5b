//! Advertisement data parsing (AD structures: `[len][type][data...]`).

/// AD type: Shortened Local Name.
const AD_TYPE_SHORT_NAME: u8 = 0x08;
/// AD type: Complete Local Name.
const AD_TYPE_COMPLETE_NAME: u8 = 0x09;

/// Iterate the well-formed AD structures in `data` as `(type, payload)`.
/// Parsing stops at the first zero length or truncated structure.
pub fn ad_structures(data: &[u8]) -> impl Iterator<Item = (u8, &[u8])> {
    let mut i = 0;
    core::iter::from_fn(move || {
        let len = *data.get(i)? as usize;
        if len == 0 || i + len >= data.len() {
            return None;
        }
        let ad_type = data[i + 1];
        let payload = &data[i + 2..i + 1 + len];
        i += len + 1;
        Some((ad_type, payload))
    })
}

/// Complete Local Name, if advertised.
pub fn complete_local_name(data: &[u8]) -> Option<&[u8]> {
    ad_structures(data)
        .find(|&(ad_type, _)| ad_type == AD_TYPE_COMPLETE_NAME)
        .map(|(_, name)| name)
}

/// Complete Local Name, falling back to the shortened one.
pub fn local_name(data: &[u8]) -> Option<&[u8]> {
    complete_local_name(data).or_else(|| {
        ad_structures(data)
            .find(|&(ad_type, _)| ad_type == AD_TYPE_SHORT_NAME)
            .map(|(_, name)| name)
    })
}

/// True if the Complete Local Name starts with `name`.
pub fn has_complete_name(data: &[u8], name: &[u8]) -> bool {
    complete_local_name(data).is_some_and(|n| n.starts_with(name))
}
