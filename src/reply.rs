//! Reply produced for every turn and the upstream-error classifier

/// Why a turn could not produce a real answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Configuration,
    SessionUnavailable,
    MessageNotSent,
    RunNotStarted,
    RunFailed,
    NoAnswer,
    /// Upstream text that reads like an error message
    UpstreamError,
}

impl FailureKind {
    /// Localized apology shown to the user
    pub fn apology(self) -> &'static str {
        match self {
            Self::Configuration => {
                "ขออภัย ระบบมีปัญหาชั่วคราว กรุณาลองใหม่อีกครั้งหรือติดต่อเจ้าหน้าที่"
            }
            Self::SessionUnavailable => "ขออภัย ระบบมีปัญหาชั่วคราว กรุณาลองใหม่อีกครั้ง",
            Self::MessageNotSent => "ขออภัย ไม่สามารถส่งข้อความได้ในขณะนี้ กรุณาลองใหม่อีกครั้ง",
            Self::RunNotStarted => {
                "ขออภัย ไม่สามารถเริ่มประมวลผลคำถามได้ในขณะนี้ กรุณาลองใหม่อีกครั้ง"
            }
            Self::RunFailed => "ขออภัย เกิดข้อผิดพลาดระหว่างประมวลผล กรุณาลองใหม่อีกครั้ง",
            Self::NoAnswer | Self::UpstreamError => {
                "ขออภัย ยังไม่ได้รับคำตอบจากระบบ กรุณาลองใหม่อีกครั้ง"
            }
        }
    }
}

/// Where a reply came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// New answer from the assistant; eligible for caching
    Fresh,
    /// Served from the duplicate-answer cache
    Cached,
    Failed(FailureKind),
}

/// Text sent back for one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub disposition: Disposition,
}

impl Reply {
    pub fn fresh(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            disposition: Disposition::Fresh,
        }
    }

    pub fn cached(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            disposition: Disposition::Cached,
        }
    }

    pub fn failed(kind: FailureKind) -> Self {
        Self {
            text: kind.apology().to_string(),
            disposition: Disposition::Failed(kind),
        }
    }

    /// Upstream text kept as-is but marked as a failure
    pub fn upstream_error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            disposition: Disposition::Failed(FailureKind::UpstreamError),
        }
    }

    pub fn is_cacheable(&self) -> bool {
        self.disposition == Disposition::Fresh
    }
}

const ERROR_MARKERS: &[&str] = &[
    "Error ",
    "Failed to ",
    "not configured",
    "not set",
    "ขออภัย ระบบมีปัญหา",
    "เกิดข้อผิดพลาด",
    "ไม่สามารถ",
    "พบข้อผิดพลาด",
];

/// Flags upstream text that is empty, too short, or phrased like an error
#[derive(Debug, Clone)]
pub struct ReplyClassifier {
    min_chars: usize,
    markers: Vec<String>,
}

impl ReplyClassifier {
    pub fn new(min_chars: usize) -> Self {
        Self {
            min_chars,
            markers: ERROR_MARKERS.iter().map(|m| (*m).to_string()).collect(),
        }
    }

    #[must_use]
    #[allow(dead_code)] // API completeness
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.markers.push(marker.into());
        self
    }

    pub fn looks_like_error(&self, text: &str) -> bool {
        // Length in characters, not bytes
        if text.trim().chars().count() < self.min_chars {
            return true;
        }
        self.markers.iter().any(|m| text.contains(m.as_str()))
    }
}

impl Default for ReplyClassifier {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_and_empty_replies_flagged() {
        let classifier = ReplyClassifier::default();
        assert!(classifier.looks_like_error(""));
        assert!(classifier.looks_like_error("   ok   "));
        assert!(!classifier.looks_like_error("ราคาซักโซฟา 2 ที่นั่ง 1,500 บาทค่ะ"));
    }

    #[test]
    fn test_min_length_counts_characters() {
        // Twelve Thai characters, thirty-six bytes
        let classifier = ReplyClassifier::new(10);
        assert!(!classifier.looks_like_error("สวัสดีครับผม"));
        assert!(classifier.looks_like_error("สวัสดี"));
    }

    #[test]
    fn test_min_length_configurable() {
        let strict = ReplyClassifier::new(40);
        let lenient = ReplyClassifier::new(1);
        let text = "Thanks, see you soon!";
        assert!(strict.looks_like_error(text));
        assert!(!lenient.looks_like_error(text));
    }

    #[test]
    fn test_error_phrases_flagged() {
        let classifier = ReplyClassifier::default();
        assert!(classifier.looks_like_error("Failed to start run, please retry later"));
        assert!(classifier.looks_like_error("ขออภัย ระบบมีปัญหาชั่วคราว กรุณาลองใหม่"));
        assert!(classifier.looks_like_error("ตอนนี้ไม่สามารถตรวจสอบคิวว่างได้ค่ะ"));
    }

    #[test]
    fn test_extra_marker() {
        let classifier = ReplyClassifier::default().with_marker("maintenance");
        assert!(classifier.looks_like_error("System under maintenance tonight"));
    }

    #[test]
    fn test_only_fresh_replies_cacheable() {
        assert!(Reply::fresh("answer").is_cacheable());
        assert!(!Reply::cached("answer").is_cacheable());
        assert!(!Reply::failed(FailureKind::RunFailed).is_cacheable());
        assert!(!Reply::upstream_error("Error x").is_cacheable());
    }

    #[test]
    fn test_every_apology_is_non_empty_and_flagged() {
        let classifier = ReplyClassifier::default();
        for kind in [
            FailureKind::Configuration,
            FailureKind::SessionUnavailable,
            FailureKind::MessageNotSent,
            FailureKind::RunNotStarted,
            FailureKind::RunFailed,
            FailureKind::NoAnswer,
        ] {
            assert!(!kind.apology().is_empty());
            assert!(
                classifier.looks_like_error(kind.apology())
                    || kind == FailureKind::NoAnswer,
                "{kind:?}"
            );
        }
    }
}
