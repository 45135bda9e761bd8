use crate::api::Site;

/// Turns a site name into a filesystem-safe directory name
///
/// The " Stack Exchange" suffix is dropped, `&amp;` becomes "and", spaces
/// become underscores, and anything outside `[A-Za-z0-9_-]` is removed.
///
/// # Example
///
/// ```
/// use stackexchange_backup::clean_site_name;
///
/// assert_eq!(clean_site_name("Arts &amp; Crafts Stack Exchange"), "Arts_and_Crafts");
/// ```
pub fn clean_site_name(site_name: &str) -> String {
    site_name
        .replace(" Stack Exchange", "")
        .replace("&amp;", "and")
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

/// Directory a site's pages are written to
///
/// Falls back to the site's API parameter (or host) when the name has no
/// character [`clean_site_name`] keeps, so such sites never share a folder.
pub fn site_directory(site: &Site) -> String {
    let cleaned = clean_site_name(&site.site_name);
    if !cleaned.is_empty() {
        return cleaned;
    }

    site.api_parameter()
        .map(|param| clean_site_name(&param.replace('.', "_")))
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "site".to_string())
}
