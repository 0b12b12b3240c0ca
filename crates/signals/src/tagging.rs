//! Keyword tagging of post text with the asset symbols it mentions.

use cryptosent_data::RawPost;

/// Returns the symbols whose keywords occur in `text` as lowercase substrings,
/// in keyword-map order. Returns `None` when nothing matches, so "untagged"
/// stays distinct from any tag set.
#[must_use]
pub fn tag_symbols(text: &str, keyword_map: &[(String, Vec<String>)]) -> Option<Vec<String>> {
    let lowered = text.to_lowercase();
    let tags: Vec<String> = keyword_map
        .iter()
        .filter(|(_, keywords)| {
            keywords
                .iter()
                .any(|k| lowered.contains(k.to_lowercase().as_str()))
        })
        .map(|(symbol, _)| symbol.clone())
        .collect();

    (!tags.is_empty()).then_some(tags)
}

/// Tags each post from its title and body and drops untagged posts.
///
/// Returns the tagged posts and the number dropped.
#[must_use]
pub fn tag_posts(posts: Vec<RawPost>, keyword_map: &[(String, Vec<String>)]) -> (Vec<RawPost>, usize) {
    let total = posts.len();
    let tagged: Vec<RawPost> = posts
        .into_iter()
        .filter_map(|mut post| {
            let symbols = tag_symbols(&post.combined_text(), keyword_map)?;
            post.mentioned_symbols = symbols;
            Some(post)
        })
        .collect();
    let dropped = total - tagged.len();
    (tagged, dropped)
}
