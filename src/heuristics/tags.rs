/// Fixed ordered keyword-to-tag rules applied to title + description.
/// All matching rules fire; tags are additive, not mutually exclusive.
const TAG_RULES: &[(&str, &str)] = &[
    ("art", "Arts & Crafts"),
    ("craft", "Arts & Crafts"),
    ("music", "Music"),
    ("concert", "Music"),
    ("science", "STEM"),
    ("stem", "STEM"),
    ("robot", "STEM"),
    ("nature", "Outdoors"),
    ("hike", "Outdoors"),
    ("garden", "Outdoors"),
    ("story", "Storytime"),
    ("storytime", "Storytime"),
    ("book", "Books"),
    ("camp", "Camps"),
    ("toddler", "Toddlers"),
    ("preschool", "Toddlers"),
    ("swim", "Sports"),
    ("sport", "Sports"),
    ("dance", "Dance"),
    ("theater", "Theater"),
    ("theatre", "Theater"),
    ("puppet", "Theater"),
    ("free", "Free"),
];

/// Builds the tag list for a listing: every keyword rule that matches the
/// concatenated title + description (case-insensitive substring), plus the
/// source's constant base tags.
pub fn infer_tags(title: &str, description: Option<&str>, base_tags: &[&str]) -> Vec<String> {
    let haystack = format!("{} {}", title, description.unwrap_or("")).to_lowercase();

    let mut tags: Vec<String> = TAG_RULES
        .iter()
        .filter(|(keyword, _)| haystack.contains(keyword))
        .map(|(_, tag)| tag.to_string())
        .collect();

    for tag in base_tags {
        tags.push(tag.to_string());
    }
    tags
}

/// Venue/title/description keywords for coarse place categories, checked in
/// this order within each text field.
const PLACE_KEYWORDS: &[(&str, &str)] = &[
    ("museum", "Museum"),
    ("park", "Park"),
    ("playground", "Park"),
    ("library", "Library"),
    ("zoo", "Zoo"),
    ("aquarium", "Aquarium"),
    ("theater", "Theater"),
    ("theatre", "Theater"),
    ("farm", "Farm"),
    ("trail", "Park"),
    ("pool", "Pool"),
    ("gym", "Gym"),
];

fn place_from_keywords(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    PLACE_KEYWORDS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, place)| place.to_string())
}

/// Classifies the coarse place category by fixed priority: explicit
/// upstream category, then legacy free-text type, then keyword matches
/// against venue name, title, and description, then `"Other"`.
pub fn classify_place_type(
    category: Option<&str>,
    legacy_type: Option<&str>,
    venue_name: Option<&str>,
    title: &str,
    description: Option<&str>,
) -> String {
    if let Some(category) = category.map(str::trim).filter(|c| !c.is_empty()) {
        return category.to_string();
    }
    if let Some(place) = legacy_type.and_then(place_from_keywords) {
        return place;
    }
    if let Some(place) = venue_name.and_then(place_from_keywords) {
        return place;
    }
    if let Some(place) = place_from_keywords(title) {
        return place;
    }
    if let Some(place) = description.and_then(place_from_keywords) {
        return place;
    }
    "Other".to_string()
}
