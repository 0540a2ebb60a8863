/// Returns `true` if the HTTP status code is in the redirection class (3xx).
///
/// A metadata fetch keeps waiting while the reported status is a redirect,
/// since the transport is still following the chain.
///
/// # Examples
///
/// ```
/// use siphon_fetch::is_redirect;
///
/// assert!(is_redirect(301));
/// assert!(is_redirect(399));
/// assert!(!is_redirect(200));
/// assert!(!is_redirect(404));
/// ```
pub fn is_redirect(status: u16) -> bool {
    (300..=399).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_redirect_common_codes() {
        assert!(is_redirect(301)); // Moved Permanently
        assert!(is_redirect(302)); // Found
        assert!(is_redirect(303)); // See Other
        assert!(is_redirect(307)); // Temporary Redirect
        assert!(is_redirect(308)); // Permanent Redirect
    }

    #[test]
    fn test_is_redirect_whole_class() {
        assert!(is_redirect(300)); // Multiple Choices
        assert!(is_redirect(304)); // Not Modified
        assert!(is_redirect(399));
    }

    #[test]
    fn test_is_redirect_other_classes() {
        assert!(!is_redirect(200)); // OK
        assert!(!is_redirect(204)); // No Content
        assert!(!is_redirect(299));
        assert!(!is_redirect(400)); // Bad Request
        assert!(!is_redirect(404)); // Not Found
        assert!(!is_redirect(500)); // Internal Server Error
    }

    #[test]
    fn test_is_redirect_invalid_codes() {
        assert!(!is_redirect(0));
        assert!(!is_redirect(99));
        assert!(!is_redirect(1000));
    }
}
