const THUMB_MARKER: &str = "cover_thumb_";
const FULL_MARKER: &str = "cover_";

/// Derives the full-size form of a location. Exact-pattern, first match
/// only; locations outside the naming convention pass through unchanged.
pub fn full_form(location: &str) -> String {
    location.replacen(THUMB_MARKER, FULL_MARKER, 1)
}

/// Both canonical forms of a location, full-size first. A ban or allow
/// decision made on either form covers both.
///
/// The thumbnail form is derived from the full form; substituting on a
/// thumbnail input directly would double the `thumb_` segment.
pub fn paired_forms(location: &str) -> (String, String) {
    let full = full_form(location);
    let thumb = full.replacen(FULL_MARKER, THUMB_MARKER, 1);
    (full, thumb)
}

/// Whether the location follows the cover naming convention. Gates remote
/// ban reporting; bans on arbitrary images stay local.
pub fn is_cover_location(location: &str) -> bool {
    location.contains(FULL_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairing_covers_both_forms_from_either_input() {
        let (full, thumb) = paired_forms("a/cover_1.png");
        assert_eq!(full, "a/cover_1.png");
        assert_eq!(thumb, "a/cover_thumb_1.png");

        let (full, thumb) = paired_forms("a/cover_thumb_1.png");
        assert_eq!(full, "a/cover_1.png");
        assert_eq!(thumb, "a/cover_thumb_1.png");
    }

    #[test]
    fn pairing_is_its_own_inverse() {
        let origin = "site/media/cover_thumb_42.jpg";
        let (full, thumb) = paired_forms(origin);
        let (full_again, thumb_again) = paired_forms(&full);
        assert_eq!((full_again.as_str(), thumb_again.as_str()), (full.as_str(), thumb.as_str()));
        let (full_again, thumb_again) = paired_forms(&thumb);
        assert_eq!((full_again.as_str(), thumb_again.as_str()), (full.as_str(), thumb.as_str()));
        assert!(thumb == origin || full == origin);
    }

    #[test]
    fn non_matching_locations_pass_through() {
        let (full, thumb) = paired_forms("a/banner.png");
        assert_eq!(full, "a/banner.png");
        assert_eq!(thumb, "a/banner.png");
    }

    #[test]
    fn cover_convention_check() {
        assert!(is_cover_location("a/cover_1.png"));
        assert!(is_cover_location("a/cover_thumb_1.png"));
        assert!(!is_cover_location("a/banner.png"));
    }
}
