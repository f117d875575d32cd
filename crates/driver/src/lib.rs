#![forbid(unsafe_code)]
#![doc = "Breadth-first search over epistemic models, and DOT rendering of games and model graphs."]

pub mod viz;

use ahash::AHashMap;
use epunfold_game::DistributedGame;
use epunfold_game::JointAction;
use epunfold_model::EpistemicModel;
use log::debug;
use log::info;

/// The result of a full unfolding run: every non-isomorphic model reached
/// from the initial model, and the joint-action assignments that connect
/// them.
pub struct LocationGraph {
    pub locations: Vec<EpistemicModel>,
    pub transitions: AHashMap<(usize, usize), Vec<Vec<JointAction>>>,
}

/// Reported as the driver discovers and expands models, so a caller can
/// print a trace of the unfolding without the driver itself depending on
/// any particular output format.
pub enum DriverEvent<'a> {
    /// A model is about to be expanded into its successors.
    Expanding { model: &'a EpistemicModel, successor_count: usize },
    /// `model` is a freshly discovered, newly enqueued successor.
    Discovered { model: &'a EpistemicModel, assignments: &'a [Vec<JointAction>] },
    /// `model` is isomorphic to an already-discovered location, so it is
    /// folded into the existing transition instead of being enqueued.
    Repetition { model: &'a EpistemicModel },
}

/// Breadth-first search from `game`'s initial model, folding newly found
/// successors into already-discovered locations whenever they are
/// isomorphic (`EpistemicModel::is_isomorphic`), per player-indistinguishable
/// model up to homomorphic core.
pub fn run(game: &DistributedGame, core_flag: bool, mut on_event: impl FnMut(DriverEvent)) -> LocationGraph {
    let initial_model = EpistemicModel::initial(game);

    let mut locations = vec![initial_model];
    let mut transitions: AHashMap<(usize, usize), Vec<Vec<JointAction>>> = AHashMap::new();

    let mut todo: std::collections::VecDeque<usize> = std::collections::VecDeque::new();
    todo.push_back(0);

    while let Some(model_index) = todo.pop_front() {
        // `locations` only grows, and `model_index` was pushed after being
        // appended, so this index is always valid.
        let successors = locations[model_index].unfold(game, core_flag);
        on_event(DriverEvent::Expanding {
            model: &locations[model_index],
            successor_count: successors.len(),
        });

        for (successor, assignments) in successors {
            on_event(DriverEvent::Discovered {
                model: &successor,
                assignments: &assignments,
            });

            let existing = locations.iter().position(|location| successor.is_isomorphic(location));
            match existing {
                Some(found_index) => {
                    on_event(DriverEvent::Repetition { model: &locations[found_index] });
                    transitions.entry((model_index, found_index)).or_default().extend(assignments);
                }
                None => {
                    locations.push(successor);
                    let new_index = locations.len() - 1;
                    transitions.entry((model_index, new_index)).or_default().extend(assignments);
                    todo.push_back(new_index);
                }
            }
        }
    }

    info!("Unfolding discovered {} distinct models", locations.len());
    LocationGraph { locations, transitions }
}
