//! View state machine.
//!
//! Transitions are a pure function of (phase, event) so the flow is testable
//! without any rendering. DataLoading carries a generation counter: a load
//! completion tagged with a stale generation is ignored, so the last
//! requested load always wins.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewPhase {
    NoSelection,
    CatalogLoading,
    AwaitingSelection,
    DataLoading { generation: u64 },
    Rendered,
    Error { message: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewEvent {
    CatalogRequested,
    CatalogLoaded,
    CatalogFailed { message: String },
    SelectionChanged,
    LoadRequested { generation: u64 },
    FetchCompleted { generation: u64 },
    FetchFailed { generation: u64, message: String },
}

pub fn transition(phase: &ViewPhase, event: &ViewEvent) -> ViewPhase {
    match (phase, event) {
        (_, ViewEvent::CatalogRequested) => ViewPhase::CatalogLoading,
        (ViewPhase::CatalogLoading, ViewEvent::CatalogLoaded) => ViewPhase::AwaitingSelection,
        (ViewPhase::CatalogLoading, ViewEvent::CatalogFailed { message }) => ViewPhase::Error {
            message: message.clone(),
        },
        // A selection change never drops rendered charts by itself; a fresh
        // load replaces them.
        (ViewPhase::NoSelection | ViewPhase::Error { .. }, ViewEvent::SelectionChanged) => {
            ViewPhase::AwaitingSelection
        }
        (_, ViewEvent::LoadRequested { generation }) => ViewPhase::DataLoading {
            generation: *generation,
        },
        (ViewPhase::DataLoading { generation }, ViewEvent::FetchCompleted { generation: done })
            if generation == done =>
        {
            ViewPhase::Rendered
        }
        (ViewPhase::DataLoading { generation }, ViewEvent::FetchFailed { generation: done, message })
            if generation == done =>
        {
            ViewPhase::Error {
                message: message.clone(),
            }
        }
        // Stale completions and everything else: stay put.
        _ => phase.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_flow() {
        let phase = transition(&ViewPhase::NoSelection, &ViewEvent::CatalogRequested);
        assert_eq!(phase, ViewPhase::CatalogLoading);
        assert_eq!(
            transition(&phase, &ViewEvent::CatalogLoaded),
            ViewPhase::AwaitingSelection
        );
        assert_eq!(
            transition(
                &ViewPhase::CatalogLoading,
                &ViewEvent::CatalogFailed {
                    message: "missing index".to_string()
                }
            ),
            ViewPhase::Error {
                message: "missing index".to_string()
            }
        );
    }

    #[test]
    fn load_completes_only_for_the_current_generation() {
        let loading = transition(
            &ViewPhase::AwaitingSelection,
            &ViewEvent::LoadRequested { generation: 2 },
        );
        assert_eq!(loading, ViewPhase::DataLoading { generation: 2 });

        // A stale completion from generation 1 is ignored.
        assert_eq!(
            transition(&loading, &ViewEvent::FetchCompleted { generation: 1 }),
            loading
        );
        assert_eq!(
            transition(&loading, &ViewEvent::FetchCompleted { generation: 2 }),
            ViewPhase::Rendered
        );
    }

    #[test]
    fn stale_failure_is_ignored_too() {
        let loading = ViewPhase::DataLoading { generation: 3 };
        assert_eq!(
            transition(
                &loading,
                &ViewEvent::FetchFailed {
                    generation: 2,
                    message: "old".to_string()
                }
            ),
            loading
        );
        assert_eq!(
            transition(
                &loading,
                &ViewEvent::FetchFailed {
                    generation: 3,
                    message: "boom".to_string()
                }
            ),
            ViewPhase::Error {
                message: "boom".to_string()
            }
        );
    }

    #[test]
    fn superseding_load_takes_over_while_loading() {
        let loading = ViewPhase::DataLoading { generation: 1 };
        let superseded = transition(&loading, &ViewEvent::LoadRequested { generation: 2 });
        assert_eq!(superseded, ViewPhase::DataLoading { generation: 2 });
        // The original load's completion no longer matters.
        assert_eq!(
            transition(&superseded, &ViewEvent::FetchCompleted { generation: 1 }),
            superseded
        );
    }

    #[test]
    fn rendered_charts_survive_a_selection_change() {
        assert_eq!(
            transition(&ViewPhase::Rendered, &ViewEvent::SelectionChanged),
            ViewPhase::Rendered
        );
        assert_eq!(
            transition(
                &ViewPhase::Error {
                    message: "x".to_string()
                },
                &ViewEvent::SelectionChanged
            ),
            ViewPhase::AwaitingSelection
        );
    }
}
