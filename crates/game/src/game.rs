use ahash::AHashMap;
use epunfold_graph::UndirectedGraph;
use epunfold_utilities::TagIndex;
use itertools::Itertools;
use thiserror::Error;

/// Tags a [`TagIndex`] as a state id, so that it cannot be confused with a
/// player id or a history id at the type level.
pub struct StateTag;

/// Tags a [`TagIndex`] as a player id.
pub struct PlayerTag;

pub type StateIndex = TagIndex<usize, StateTag>;
pub type PlayerIndex = TagIndex<usize, PlayerTag>;

/// A tuple with one action per player, in player order.
pub type JointAction = Vec<String>;

#[derive(Error, Debug)]
pub enum GameConstructionError {
    #[error("initial state {0} is not a valid state id")]
    InvalidInitialState(usize),

    #[error("the actions list and the indistinguishability class list have different lengths ({0} vs {1})")]
    PlayerCountMismatch(usize, usize),

    #[error("player {0}'s indistinguishability classes do not partition the state ids: state {1} appears twice")]
    NotAPartition(usize, usize),

    #[error("player {0}'s indistinguishability classes name state {1}, which is not a valid state id")]
    IndistinguishableStateOutOfRange(usize, usize),
}

#[derive(Error, Debug)]
pub enum GameAccessError {
    #[error("{0} is not a valid state id")]
    InvalidState(usize),

    #[error("joint action has {0} components but the game has {1} players")]
    WrongArity(usize, usize),

    #[error("player {player} cannot perform action {action:?}")]
    UnknownAction { player: usize, action: String },

    #[error("successor state set must be non-empty")]
    EmptySuccessors,

    #[error("successor states must be unique, but {0} was repeated")]
    DuplicateSuccessor(usize),
}

/// A multiplayer game of imperfect information.
///
/// The imperfect information is modeled as an equivalence relation per
/// player: any two states in the same indistinguishability class are
/// indistinguishable to that player. A single move is decided by the joint
/// action of the entire coalition of players; the game may be
/// non-deterministic, so a move can lead to multiple successor states.
pub struct DistributedGame {
    state_names: Vec<String>,
    initial_state: StateIndex,
    actions_list: Vec<Vec<String>>,
    moves: AHashMap<(JointAction, usize), Vec<StateIndex>>,
    indist_graphs: Vec<UndirectedGraph>,
}

impl DistributedGame {
    /// Builds a distributed game. `indist_classes_list[p]` is a list of
    /// indistinguishability classes for player `p`; states omitted from
    /// every class are implicitly singleton classes.
    pub fn new(
        state_names: Vec<String>,
        initial_state: usize,
        actions_list: Vec<Vec<String>>,
        indist_classes_list: Vec<Vec<Vec<usize>>>,
    ) -> Result<Self, GameConstructionError> {
        let state_count = state_names.len();
        if initial_state >= state_count {
            return Err(GameConstructionError::InvalidInitialState(initial_state));
        }

        if actions_list.len() != indist_classes_list.len() {
            return Err(GameConstructionError::PlayerCountMismatch(
                actions_list.len(),
                indist_classes_list.len(),
            ));
        }

        let actions_list: Vec<Vec<String>> = actions_list
            .into_iter()
            .map(|actions| {
                let mut deduped = Vec::new();
                for action in actions {
                    if !deduped.contains(&action) {
                        deduped.push(action);
                    }
                }
                deduped
            })
            .collect();

        let mut indist_graphs = Vec::with_capacity(indist_classes_list.len());
        for (player, indist_classes) in indist_classes_list.into_iter().enumerate() {
            indist_graphs.push(indist_graph_from_classes(player, &indist_classes, state_count)?);
        }

        Ok(DistributedGame {
            state_names,
            initial_state: StateIndex::new(initial_state),
            actions_list,
            moves: AHashMap::new(),
            indist_graphs,
        })
    }

    /// Sets the successor states of a `(joint_action, from_state)` move.
    /// `next_states` must be a non-empty set of unique, valid state ids.
    pub fn set_move(
        &mut self,
        joint_action: JointAction,
        from_state: usize,
        next_states: Vec<usize>,
    ) -> Result<(), GameAccessError> {
        self.validate_key(&joint_action, from_state)?;
        self.validate_next_states(&next_states)?;

        let next_states = next_states.into_iter().map(StateIndex::new).collect();
        self.moves.insert((joint_action, from_state), next_states);
        Ok(())
    }

    /// Returns the successor states reached by performing `joint_action` at
    /// `from_state`. The move map is total: an unset move defaults to a
    /// deterministic self loop.
    pub fn get_move(&self, joint_action: &JointAction, from_state: usize) -> Result<Vec<StateIndex>, GameAccessError> {
        self.validate_key(joint_action, from_state)?;

        Ok(match self.moves.get(&(joint_action.clone(), from_state)) {
            Some(next_states) => next_states.clone(),
            None => vec![StateIndex::new(from_state)],
        })
    }

    pub fn states(&self) -> impl Iterator<Item = StateIndex> + '_ {
        (0..self.state_names.len()).map(StateIndex::new)
    }

    pub fn num_of_states(&self) -> usize {
        self.state_names.len()
    }

    pub fn state_names(&self) -> &[String] {
        &self.state_names
    }

    pub fn state_name(&self, state: StateIndex) -> &str {
        &self.state_names[state.value()]
    }

    pub fn initial_state(&self) -> StateIndex {
        self.initial_state
    }

    pub fn players(&self) -> impl Iterator<Item = PlayerIndex> + '_ {
        (0..self.actions_list.len()).map(PlayerIndex::new)
    }

    pub fn num_of_players(&self) -> usize {
        self.actions_list.len()
    }

    pub fn actions(&self, player: PlayerIndex) -> &[String] {
        &self.actions_list[player.value()]
    }

    /// Returns every joint action `A_0 x ... x A_{n-1}`.
    pub fn joint_actions(&self) -> impl Iterator<Item = JointAction> + '_ {
        self.actions_list
            .iter()
            .map(|actions| actions.iter().cloned())
            .multi_cartesian_product()
    }

    /// Whether `player` can tell `state1` and `state2` apart.
    pub fn are_distinguishable(&self, player: PlayerIndex, state1: StateIndex, state2: StateIndex) -> bool {
        !self.indist_graphs[player.value()].has_edge(state1.value(), state2.value())
    }

    pub fn indist_graph(&self, player: PlayerIndex) -> &UndirectedGraph {
        &self.indist_graphs[player.value()]
    }

    /// Returns every `(joint_action, from_state, to_states)` triple, in
    /// joint-action-major order, for rendering the full move relation.
    /// Unset moves are included via their default self loop.
    pub fn all_moves(&self) -> impl Iterator<Item = (JointAction, StateIndex, Vec<StateIndex>)> + '_ {
        self.joint_actions().flat_map(move |joint_action| {
            self.states().map(move |state| {
                let destinations = self
                    .get_move(&joint_action, state.value())
                    .expect("joint_action and state are drawn from this game's own ranges");
                (joint_action.clone(), state, destinations)
            })
        })
    }

    fn validate_key(&self, joint_action: &JointAction, state: usize) -> Result<(), GameAccessError> {
        if state >= self.state_names.len() {
            return Err(GameAccessError::InvalidState(state));
        }
        if joint_action.len() != self.actions_list.len() {
            return Err(GameAccessError::WrongArity(joint_action.len(), self.actions_list.len()));
        }
        for (player, action) in joint_action.iter().enumerate() {
            if !self.actions_list[player].contains(action) {
                return Err(GameAccessError::UnknownAction {
                    player,
                    action: action.clone(),
                });
            }
        }
        Ok(())
    }

    fn validate_next_states(&self, next_states: &[usize]) -> Result<(), GameAccessError> {
        if next_states.is_empty() {
            return Err(GameAccessError::EmptySuccessors);
        }
        let mut seen = ahash::AHashSet::new();
        for &state in next_states {
            if state >= self.state_names.len() {
                return Err(GameAccessError::InvalidState(state));
            }
            if !seen.insert(state) {
                return Err(GameAccessError::DuplicateSuccessor(state));
            }
        }
        Ok(())
    }
}

/// Builds the indistinguishability graph of a player from its equivalence
/// classes: a complete subgraph per class plus a self-loop on every state,
/// since a state not named in any class is an implicit singleton class.
fn indist_graph_from_classes(
    player: usize,
    indist_classes: &[Vec<usize>],
    state_count: usize,
) -> Result<UndirectedGraph, GameConstructionError> {
    let mut classed = ahash::AHashSet::new();
    for class in indist_classes {
        for &state in class {
            if state >= state_count {
                return Err(GameConstructionError::IndistinguishableStateOutOfRange(player, state));
            }
            if !classed.insert(state) {
                return Err(GameConstructionError::NotAPartition(player, state));
            }
        }
    }

    let mut graph = UndirectedGraph::new();
    for class in indist_classes {
        for i in 0..class.len() {
            for j in (i + 1)..class.len() {
                graph.add_edge(class[i], class[j]);
            }
        }
    }
    for state in 0..state_count {
        graph.add_edge(state, state);
    }
    Ok(graph)
}
