//! Release-stage classification from upstream text.

use crate::models::ReleaseStage;

/// Phrases that indicate something is announced but not yet available.
const ANNOUNCEMENT_KEYWORDS: [&str; 20] = [
    "coming soon",
    "announcing",
    "preview",
    "teaser",
    "upcoming",
    "will be released",
    "stay tuned",
    "sneak peek",
    "roadmap",
    "planned",
    "expected",
    "eta",
    "wip",
    "work in progress",
    "alpha",
    "beta",
    "rc",
    "release candidate",
    "pre-release",
    "prerelease",
];

/// Phrases that indicate an actual launch.
const LAUNCH_KEYWORDS: [&str; 11] = [
    "released",
    "available now",
    "v1.",
    "v2.",
    "stable",
    "production ready",
    "ready to use",
    "download now",
    "install",
    "pip install",
    "weights released",
];

/// Classifies free-form upstream text as an announcement or a launch.
/// Announcement keywords win over launch keywords; a prerelease flag wins
/// over both.
pub fn detect_release_stage(text: &str, is_prerelease: bool) -> ReleaseStage {
    if text.is_empty() && !is_prerelease {
        return ReleaseStage::Unknown;
    }
    if is_prerelease {
        return ReleaseStage::Announced;
    }

    let text = text.to_lowercase();
    if ANNOUNCEMENT_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        return ReleaseStage::Announced;
    }
    if LAUNCH_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        return ReleaseStage::Launched;
    }
    ReleaseStage::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prerelease_flag_wins() {
        assert_eq!(detect_release_stage("weights released", true), ReleaseStage::Announced);
    }

    #[test]
    fn announcement_keywords_win_over_launch_keywords() {
        assert_eq!(
            detect_release_stage("Coming soon: weights released next week", false),
            ReleaseStage::Announced
        );
    }

    #[test]
    fn launch_keywords_classify_as_launched() {
        assert_eq!(
            detect_release_stage("Z-Image weights released, pip install z-image", false),
            ReleaseStage::Launched
        );
    }

    #[test]
    fn unrelated_text_is_unknown() {
        assert_eq!(detect_release_stage("fix typo in readme", false), ReleaseStage::Unknown);
        assert_eq!(detect_release_stage("", false), ReleaseStage::Unknown);
    }
}
