//! The two idempotent edits applied to airtrain's telemetry service module.
//!
//! Each edit is a pure content-string transform guarded by a precondition,
//! so re-running the sequence on already-patched content is a no-op. Anchors
//! are exact multi-line literals; if the vendor's source has drifted and an
//! anchor no longer matches verbatim, that edit leaves the content untouched
//! (a soft miss, not a failure).

/// Debug-trace message emitted by the injected early-return guard.
///
/// Doubles as the applied-marker for [`insert_disabled_guard`]: if this
/// phrase appears anywhere in the content, the guard is already in place.
pub const DISABLED_SENTINEL: &str =
    "Telemetry explicitly disabled via AIRTRAIN_TELEMETRY_ENABLED=false";

/// Constructor-preamble assignment inserted by [`insert_client_preinit`],
/// at method-body indentation. Matched as a whole line so the deeper-indented
/// assignment inside the guarded conditional does not count as applied.
pub const CLIENT_PREINIT_LINE: &str = "        self._posthog_client = None";

/// How far into the file the constructor preamble is expected to sit.
/// [`insert_client_preinit`] only scans this many lines for its marker.
const PREINIT_SCAN_LINES: usize = 80;

/// Feature-flag assignment plus the conditional that decides whether the
/// reporting client gets initialized. Matched verbatim.
const GUARD_ANCHOR: &str = concat!(
    "        isBeta = True  # TODO: remove this once out of beta\n",
    "        if telemetry_disabled and not isBeta:\n",
    "            self._posthog_client = None\n",
    "        else:\n",
);

/// Same block with the early-return guard inserted ahead of the original
/// conditional, which is preserved unchanged.
const GUARD_REPLACEMENT: &str = concat!(
    "        isBeta = True  # TODO: remove this once out of beta\n",
    "        if telemetry_disabled:\n",
    "            logger.debug('Telemetry explicitly disabled via AIRTRAIN_TELEMETRY_ENABLED=false')\n",
    "            return\n",
    "        if telemetry_disabled and not isBeta:\n",
    "            self._posthog_client = None\n",
    "        else:\n",
);

/// Constructor preamble around the logging-level computation. The middle
/// line is whitespace-only in the vendor source, trailing spaces included.
const PREINIT_ANCHOR: &str = concat!(
    "        self.debug_logging = os.getenv('AIRTRAIN_LOGGING_LEVEL', 'info').lower() == 'debug'\n",
    "        \n",
    "        # System information to include with telemetry\n",
);

const PREINIT_REPLACEMENT: &str = concat!(
    "        self.debug_logging = os.getenv('AIRTRAIN_LOGGING_LEVEL', 'info').lower() == 'debug'\n",
    "        self._posthog_client = None\n",
    "\n",
    "        # System information to include with telemetry\n",
);

/// Run the full edit sequence.
///
/// Ordering matters: [`insert_client_preinit`] inspects content *after* the
/// guard edit has run, so the guard must go first.
pub fn apply_edits(content: &str) -> String {
    let content = insert_disabled_guard(content);
    insert_client_preinit(&content)
}

/// Edit 1: make the telemetry constructor return early when telemetry is
/// explicitly disabled, instead of falling through to client initialization.
pub fn insert_disabled_guard(content: &str) -> String {
    if content.contains(DISABLED_SENTINEL) {
        return content.to_string();
    }
    content.replace(GUARD_ANCHOR, GUARD_REPLACEMENT)
}

/// Edit 2: pre-initialize `_posthog_client` so the early-return path from
/// Edit 1 never leaves the attribute unassigned.
pub fn insert_client_preinit(content: &str) -> String {
    let already_assigned = content
        .lines()
        .take(PREINIT_SCAN_LINES)
        .any(|line| line == CLIENT_PREINIT_LINE);
    if already_assigned {
        return content.to_string();
    }
    content.replace(PREINIT_ANCHOR, PREINIT_REPLACEMENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn unpatched_service() -> String {
        format!(
            "import logging\nimport os\n\nlogger = logging.getLogger(__name__)\n\n\nclass ProductTelemetry:\n    def __init__(self) -> None:\n        telemetry_disabled = os.getenv('AIRTRAIN_TELEMETRY_ENABLED', 'true').lower() == 'false'\n{preinit}        self._system_info = None\n{guard}            self._posthog_client = Posthog(project_api_key=API_KEY)\n",
            preinit = PREINIT_ANCHOR,
            guard = GUARD_ANCHOR,
        )
    }

    #[test]
    fn full_sequence_applies_both_edits() {
        let original = unpatched_service();
        let updated = apply_edits(&original);

        assert_ne!(updated, original);
        assert!(updated.contains(DISABLED_SENTINEL));
        assert!(updated.contains("            return\n"));
        assert!(updated.contains(GUARD_REPLACEMENT));
        assert!(updated.contains(PREINIT_REPLACEMENT));
        // Non-replaced portions survive verbatim.
        assert!(updated.contains("telemetry_disabled = os.getenv"));
        assert!(updated.contains("self._system_info = None"));
        assert!(updated.contains("Posthog(project_api_key=API_KEY)"));
    }

    #[test]
    fn sequence_is_idempotent_on_real_content() {
        let once = apply_edits(&unpatched_service());
        let twice = apply_edits(&once);
        assert_eq!(twice, once);
    }

    #[test]
    fn patched_content_passes_through_byte_identical() {
        let patched = apply_edits(&unpatched_service());
        assert_eq!(apply_edits(&patched), patched);
        // Exactly one preamble assignment, no duplicate insertion.
        assert_eq!(patched.matches(PREINIT_REPLACEMENT).count(), 1);
    }

    #[test]
    fn guard_skipped_when_sentinel_present() {
        // Sentinel present but anchor intact: Edit 1 must not fire again.
        let content = format!("# {}\n{}", DISABLED_SENTINEL, GUARD_ANCHOR);
        let updated = insert_disabled_guard(&content);
        assert_eq!(updated, content);
    }

    #[test]
    fn preinit_skipped_when_assignment_in_first_80_lines() {
        let content = format!("{}\n{}", CLIENT_PREINIT_LINE, PREINIT_ANCHOR);
        let updated = insert_client_preinit(&content);
        assert_eq!(updated, content);
    }

    #[test]
    fn conditional_body_assignment_does_not_satisfy_preinit() {
        // The 12-space assignment inside the guard conditional is not the
        // preamble assignment; Edit 2 still has to fire.
        let content = format!("{}{}", GUARD_ANCHOR, PREINIT_ANCHOR);
        let updated = apply_edits(&content);
        assert!(updated.contains(PREINIT_REPLACEMENT));
    }

    #[test]
    fn preinit_applies_when_assignment_only_beyond_scan_window() {
        // An assignment buried past line 80 does not satisfy the precondition.
        let filler = "# filler\n".repeat(81);
        let content = format!("{}{}\n{}", filler, CLIENT_PREINIT_LINE, PREINIT_ANCHOR);
        let updated = insert_client_preinit(&content);
        assert!(updated.contains(PREINIT_REPLACEMENT));
    }

    #[test]
    fn selective_application_fires_only_missing_edit() {
        // Guard anchor unpatched, preamble assignment already present up top.
        let content = format!("{}\n\n{}", CLIENT_PREINIT_LINE, GUARD_ANCHOR);
        let updated = apply_edits(&content);

        assert!(updated.contains(DISABLED_SENTINEL));
        // Edit 2 added nothing: the sole preamble assignment is the one that
        // was already there.
        assert_eq!(
            updated
                .lines()
                .filter(|line| *line == CLIENT_PREINIT_LINE)
                .count(),
            1
        );
        assert!(!updated.contains(PREINIT_REPLACEMENT));
    }

    #[test]
    fn untouched_when_no_anchor_matches() {
        let drifted = "def __init__(self):\n    pass  # upstream rewrote everything\n";
        assert_eq!(apply_edits(drifted), drifted);
    }

    #[test]
    fn whitespace_drift_in_anchor_is_a_soft_miss() {
        // Tabs instead of spaces: anchor no longer matches verbatim.
        let drifted = GUARD_ANCHOR.replace("        ", "\t");
        assert_eq!(apply_edits(&drifted), drifted);
    }

    /// Content built from realistic fragments: random preamble lines, the
    /// anchors optionally present or pre-replaced, random trailing lines.
    fn service_like_content() -> impl Strategy<Value = String> {
        let line = "[ -~]{0,40}";
        let lines = proptest::collection::vec(line, 0..20);
        let guard_part = prop_oneof![
            Just(String::new()),
            Just(GUARD_ANCHOR.to_string()),
            Just(GUARD_REPLACEMENT.to_string()),
        ];
        let preinit_part = prop_oneof![
            Just(String::new()),
            Just(PREINIT_ANCHOR.to_string()),
            Just(PREINIT_REPLACEMENT.to_string()),
        ];
        (lines.clone(), preinit_part, guard_part, lines).prop_map(
            |(head, preinit, guard, tail)| {
                format!(
                    "{}\n{}{}{}",
                    head.join("\n"),
                    preinit,
                    guard,
                    tail.join("\n")
                )
            },
        )
    }

    proptest! {
        #[test]
        fn apply_edits_is_idempotent(content in service_like_content()) {
            let once = apply_edits(&content);
            let twice = apply_edits(&once);
            prop_assert_eq!(twice, once);
        }
    }
}
