//! Which task list is on screen.
//!
//! Evaluated in strict order once the sort state is `Success`:
//! 1. search triggered: the searched-tasks result,
//! 2. sort `NONE`: all tasks,
//! 3. sort `LOW`: the low-priority projection,
//! 4. sort `HIGH`: the high-priority projection,
//! 5. sort `MEDIUM`: nothing (no medium projection exists).
//!
//! Tri-state sources present nothing until they reach `Success`.

use crate::model::task::{Priority, Task};
use crate::viewmodel::request_state::RequestState;

/// Search bar mode. Only `Triggered` switches the list to search results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchBarState {
    #[default]
    Closed,
    /// Bar visible, no query submitted yet.
    Opened,
    /// A query was submitted; the list shows its results.
    Triggered,
}

impl SearchBarState {
    pub fn is_search_active(self) -> bool {
        self == Self::Triggered
    }
}

/// Source of the presented list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSource {
    Searched,
    All,
    LowPriority,
    HighPriority,
}

/// Presented list and where it came from. `tasks` may be empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListSelection<'a> {
    pub source: ListSource,
    pub tasks: &'a [Task],
}

/// Borrowed snapshot of every input the selection reads.
#[derive(Debug, Clone, Copy)]
pub struct ListSources<'a> {
    pub all_tasks: &'a RequestState<Vec<Task>>,
    pub searched_tasks: &'a RequestState<Vec<Task>>,
    pub sort_state: &'a RequestState<Priority>,
    pub low_priority_tasks: &'a [Task],
    pub high_priority_tasks: &'a [Task],
    pub search_bar: SearchBarState,
}

/// Picks the list to present, or `None` to present nothing.
pub fn select_task_list<'a>(sources: &ListSources<'a>) -> Option<ListSelection<'a>> {
    let RequestState::Success(sort) = sources.sort_state else {
        return None;
    };

    if sources.search_bar.is_search_active() {
        return success_list(sources.searched_tasks, ListSource::Searched);
    }

    match sort {
        Priority::None => success_list(sources.all_tasks, ListSource::All),
        Priority::Low => Some(ListSelection {
            source: ListSource::LowPriority,
            tasks: sources.low_priority_tasks,
        }),
        Priority::High => Some(ListSelection {
            source: ListSource::HighPriority,
            tasks: sources.high_priority_tasks,
        }),
        Priority::Medium => None,
    }
}

fn success_list(state: &RequestState<Vec<Task>>, source: ListSource) -> Option<ListSelection<'_>> {
    state.data().map(|tasks| ListSelection {
        source,
        tasks: tasks.as_slice(),
    })
}

#[cfg(test)]
mod tests {
    use super::{select_task_list, ListSource, ListSources, SearchBarState};
    use crate::model::task::{Priority, Task};
    use crate::viewmodel::request_state::RequestState;

    struct Fixture {
        all: RequestState<Vec<Task>>,
        searched: RequestState<Vec<Task>>,
        low: Vec<Task>,
        high: Vec<Task>,
    }

    impl Fixture {
        fn new() -> Self {
            let tasks = vec![
                Task::with_id(1, "a", "x", Priority::Low),
                Task::with_id(2, "b", "y", Priority::High),
                Task::with_id(3, "c", "z", Priority::Medium),
            ];
            Self {
                low: vec![tasks[0].clone()],
                high: vec![tasks[1].clone()],
                searched: RequestState::Success(vec![tasks[2].clone()]),
                all: RequestState::Success(tasks),
            }
        }

        fn sources<'a>(
            &'a self,
            sort: &'a RequestState<Priority>,
            search_bar: SearchBarState,
        ) -> ListSources<'a> {
            ListSources {
                all_tasks: &self.all,
                searched_tasks: &self.searched,
                sort_state: sort,
                low_priority_tasks: &self.low,
                high_priority_tasks: &self.high,
                search_bar,
            }
        }
    }

    #[test]
    fn nothing_until_sort_state_succeeds() {
        let fixture = Fixture::new();
        for sort in [RequestState::Idle, RequestState::Loading] {
            let sources = fixture.sources(&sort, SearchBarState::Triggered);
            assert!(select_task_list(&sources).is_none());
        }
    }

    #[test]
    fn sort_value_picks_projection() {
        let fixture = Fixture::new();

        let none = RequestState::Success(Priority::None);
        let selected = select_task_list(&fixture.sources(&none, SearchBarState::Closed)).unwrap();
        assert_eq!(selected.source, ListSource::All);
        assert_eq!(selected.tasks.len(), 3);

        let low = RequestState::Success(Priority::Low);
        let selected = select_task_list(&fixture.sources(&low, SearchBarState::Opened)).unwrap();
        assert_eq!(selected.source, ListSource::LowPriority);
        assert!(selected.tasks.iter().all(|task| task.priority == Priority::Low));

        let high = RequestState::Success(Priority::High);
        let selected = select_task_list(&fixture.sources(&high, SearchBarState::Closed)).unwrap();
        assert_eq!(selected.source, ListSource::HighPriority);
        assert_eq!(selected.tasks[0].id, 2);
    }

    #[test]
    fn medium_sort_presents_nothing() {
        let fixture = Fixture::new();
        let medium = RequestState::Success(Priority::Medium);
        assert!(select_task_list(&fixture.sources(&medium, SearchBarState::Closed)).is_none());
    }

    #[test]
    fn triggered_search_wins_over_any_sort() {
        let fixture = Fixture::new();
        for priority in Priority::ALL {
            let sort = RequestState::Success(priority);
            let selected =
                select_task_list(&fixture.sources(&sort, SearchBarState::Triggered)).unwrap();
            assert_eq!(selected.source, ListSource::Searched);
            assert_eq!(selected.tasks[0].id, 3);
        }
    }

    #[test]
    fn triggered_search_without_result_presents_nothing() {
        let mut fixture = Fixture::new();
        fixture.searched = RequestState::Loading;
        let sort = RequestState::Success(Priority::None);
        assert!(select_task_list(&fixture.sources(&sort, SearchBarState::Triggered)).is_none());
    }
}
