//! Links between the timeline and the album detail page.

use url::form_urlencoded;

pub const ALBUM_PAGE: &str = "album.html";
pub const ALBUM_ID_PARAM: &str = "id";

/// `album.html?id=<album id>`, with the id percent-encoded.
pub fn album_link(album_id: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(ALBUM_ID_PARAM, album_id)
        .finish();
    format!("{ALBUM_PAGE}?{query}")
}

/// Reads the album id from a query string such as `?id=abc` (leading `?` optional).
pub fn album_id_from_query(query: &str) -> Option<String> {
    let query = query.strip_prefix('?').unwrap_or(query);
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == ALBUM_ID_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty())
}
