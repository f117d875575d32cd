#![forbid(unsafe_code)]
#![doc = "The epistemic model: the histories a distributed game's players cannot yet tell apart, and the unfold / core / isomorphism operations over them."]

use ahash::AHashMap;
use epunfold_game::DistributedGame;
use epunfold_game::JointAction;
use epunfold_game::PlayerIndex;
use epunfold_game::StateIndex;
use epunfold_graph::Mapping;
use epunfold_graph::UndirectedGraph;
use epunfold_graph::intersect_mappings;
use epunfold_graph::partition_preserving;
use itertools::Itertools;
use log::debug;

/// A model of each player's knowledge of the history of a game so far: a
/// list of histories (each tagged with its last state) and, per player, an
/// indistinguishability graph over those histories.
///
/// Unlike the distributed game it unfolds, an `EpistemicModel` does not
/// borrow the game: every operation that needs the transition relation
/// takes the game as an explicit argument.
#[derive(Debug, Clone)]
pub struct EpistemicModel {
    last_states: Vec<StateIndex>,
    indist_graphs: Vec<UndirectedGraph>,
}

impl EpistemicModel {
    /// The initial model: one history, the game's initial state, known to
    /// every player exactly (a self-loop on history `0` and nothing else).
    pub fn initial(game: &DistributedGame) -> Self {
        let indist_graphs = game
            .players()
            .map(|_| {
                let mut graph = UndirectedGraph::new();
                graph.add_edge(0, 0);
                graph
            })
            .collect();
        EpistemicModel {
            last_states: vec![game.initial_state()],
            indist_graphs,
        }
    }

    pub fn history_count(&self) -> usize {
        self.last_states.len()
    }

    pub fn player_count(&self) -> usize {
        self.indist_graphs.len()
    }

    pub fn last_states(&self) -> &[StateIndex] {
        &self.last_states
    }

    pub fn indist_graph(&self, player: PlayerIndex) -> &UndirectedGraph {
        &self.indist_graphs[player.value()]
    }

    /// A human-readable dump of the model, used by the CLI's `-v` output.
    pub fn describe(&self, game: &DistributedGame) -> String {
        let mut out = String::new();
        out.push_str("MODEL {\n");
        out.push_str("  last state per history\n    ");
        let names: Vec<&str> = self.last_states.iter().map(|&state| game.state_name(state)).collect();
        out.push_str(&format!("{names:?}\n"));
        out.push_str("  indistinguishability relations per player\n");
        for graph in &self.indist_graphs {
            out.push_str("    ");
            let edges: Vec<(&str, &str)> = graph
                .edges()
                .filter(|&(u, v)| u != v)
                .map(|(u, v)| (game.state_name(self.last_states[u]), game.state_name(self.last_states[v])))
                .collect();
            out.push_str(&format!("{edges:?}\n"));
        }
        out.push('}');
        out
    }

    /// Every compatible joint-action assignment, grouped by the successor
    /// model(s) it produces, each paired with every assignment that induces
    /// that same result.
    pub fn unfold(&self, game: &DistributedGame, core_flag: bool) -> Vec<(EpistemicModel, Vec<Vec<JointAction>>)> {
        let compatible = self.compatible_joint_actions(game);
        let grouped = self.joint_actions_by_result(game, compatible);

        let mut result = Vec::new();
        for (_, assignments) in grouped {
            let representative = &assignments[0];
            for successor in self.next(game, representative, core_flag) {
                result.push((successor, assignments.clone()));
            }
        }
        result
    }

    /// The successor models induced by performing `joint_actions[h]` at
    /// every history `h`, split into independent submodels if the new
    /// indistinguishability relation disconnects them.
    pub fn next(&self, game: &DistributedGame, joint_actions: &[JointAction], core_flag: bool) -> Vec<EpistemicModel> {
        let (new_last_states, successors_list) = self.next_histories(game, joint_actions);

        let mut new_indist_graphs: Vec<UndirectedGraph> = (0..self.player_count()).map(|_| UndirectedGraph::new()).collect();
        let mut indist_union = UndirectedGraph::new();
        for history in 0..new_last_states.len() {
            indist_union.add_node(history);
        }

        for player_index in 0..self.player_count() {
            let player = PlayerIndex::new(player_index);
            for (u, v) in self.new_indist_histories(game, player, &new_last_states, &successors_list) {
                new_indist_graphs[player_index].add_edge(u, v);
                indist_union.add_edge(u, v);
            }
        }

        let components = indist_union.connected_components();
        let next_models: Vec<EpistemicModel> = if components.len() <= 1 {
            vec![EpistemicModel {
                last_states: new_last_states,
                indist_graphs: new_indist_graphs,
            }]
        } else {
            debug!("Successor model splits into {} independent submodels", components.len());
            components
                .into_iter()
                .map(|histories| Self::induced_submodel(&histories, &new_last_states, &new_indist_graphs))
                .collect()
        };

        if core_flag { next_models.iter().map(EpistemicModel::core).collect() } else { next_models }
    }

    /// The homomorphic core: the homomorphically equivalent model with the
    /// fewest histories, unique up to isomorphism.
    pub fn core(&self) -> EpistemicModel {
        let mut retraction_sets = self.indist_graphs.iter().map(|graph| {
            let retractions = epunfold_retraction::find_retractions(graph);
            partition_preserving(retractions, &self.last_states)
        });

        let mut intersection = retraction_sets.next().unwrap_or_default();
        for set in retraction_sets {
            intersection = intersect_mappings(intersection, &set);
        }

        let core_retraction = intersection.into_iter().max_by_key(Mapping::len).unwrap_or_else(Mapping::identity);

        if core_retraction.is_identity() {
            return self.clone();
        }

        let new_graphs: Vec<UndirectedGraph> = self
            .indist_graphs
            .iter()
            .map(|graph| graph.relabel(|v| core_retraction.apply(v)))
            .collect();
        let image_vertices: Vec<usize> = new_graphs[0].nodes().collect();
        Self::induced_submodel(&image_vertices, &self.last_states, &new_graphs)
    }

    /// Whether this model and `other` are isomorphic: same history count,
    /// same multiset of last states, and a single bijection that is a graph
    /// isomorphism for every player's indistinguishability graph at once
    /// while preserving last states.
    pub fn is_isomorphic(&self, other: &EpistemicModel) -> bool {
        if self.history_count() != other.history_count() {
            return false;
        }
        if self.player_count() != other.player_count() {
            return false;
        }
        let mut ours = self.last_states.clone();
        ours.sort();
        let mut theirs = other.last_states.clone();
        theirs.sort();
        if ours != theirs {
            return false;
        }

        let mut iso_sets = self.indist_graphs.iter().zip(other.indist_graphs.iter()).map(|(g1, g2)| {
            let isomorphisms = epunfold_isomorphism::find_isomorphisms(g1, g2);
            cross_partition_preserving(isomorphisms, &self.last_states, &other.last_states)
        });

        let mut intersection = match iso_sets.next() {
            Some(set) => set,
            None => return true,
        };
        for set in iso_sets {
            intersection = intersect_mappings(intersection, &set);
        }
        !intersection.is_empty()
    }

    fn compatible_joint_actions(&self, game: &DistributedGame) -> Vec<Vec<JointAction>> {
        let per_player: Vec<Vec<Vec<String>>> = game.players().map(|player| self.compatible_actions(game, player)).collect();
        if per_player.is_empty() {
            return vec![vec![Vec::new(); self.history_count()]];
        }

        per_player
            .into_iter()
            .multi_cartesian_product()
            .map(|per_player_assignment| {
                (0..self.history_count())
                    .map(|history| per_player_assignment.iter().map(|assignment| assignment[history].clone()).collect::<JointAction>())
                    .collect()
            })
            .collect()
    }

    /// Every way to assign `player`'s actions one-per-component, expanded to
    /// one action string per history (histories sharing a component always
    /// get the same action, since the player cannot distinguish them).
    fn compatible_actions(&self, game: &DistributedGame, player: PlayerIndex) -> Vec<Vec<String>> {
        let actions = game.actions(player);
        let components = self.indist_graphs[player.value()].connected_components();

        std::iter::repeat_n(actions.iter().cloned(), components.len())
            .multi_cartesian_product()
            .map(|combination| {
                let mut assignment = vec![String::new(); self.history_count()];
                for (component, action) in components.iter().zip(combination.iter()) {
                    for &history in component {
                        assignment[history] = action.clone();
                    }
                }
                assignment
            })
            .collect()
    }

    fn joint_actions_by_result(&self, game: &DistributedGame, combinations: Vec<Vec<JointAction>>) -> Vec<(Vec<Vec<StateIndex>>, Vec<Vec<JointAction>>)> {
        let mut grouped: AHashMap<Vec<Vec<StateIndex>>, Vec<Vec<JointAction>>> = AHashMap::new();
        for joint_actions in combinations {
            let result: Vec<Vec<StateIndex>> = joint_actions
                .iter()
                .zip(self.last_states.iter())
                .map(|(joint_action, &state)| {
                    game.get_move(joint_action, state.value())
                        .expect("joint action was generated from this model's own compatible actions")
                })
                .collect();
            grouped.entry(result).or_default().push(joint_actions);
        }
        grouped.into_iter().collect()
    }

    fn next_histories(&self, game: &DistributedGame, joint_actions: &[JointAction]) -> (Vec<StateIndex>, Vec<Vec<usize>>) {
        let mut new_last_states = Vec::new();
        let mut successors_list = Vec::with_capacity(self.history_count());

        for (&last_state, joint_action) in self.last_states.iter().zip(joint_actions) {
            let destinations = game
                .get_move(joint_action, last_state.value())
                .expect("joint action was generated from this model's own compatible actions");
            let mut successor_histories = Vec::with_capacity(destinations.len());
            for destination in destinations {
                let new_history = new_last_states.len();
                new_last_states.push(destination);
                successor_histories.push(new_history);
            }
            successors_list.push(successor_histories);
        }
        (new_last_states, successors_list)
    }

    fn new_indist_histories(
        &self,
        game: &DistributedGame,
        player: PlayerIndex,
        new_last_states: &[StateIndex],
        successors_list: &[Vec<usize>],
    ) -> Vec<(usize, usize)> {
        let mut result = Vec::new();
        let old_graph = &self.indist_graphs[player.value()];
        for (h1, h2) in old_graph.edges() {
            for &n1 in &successors_list[h1] {
                for &n2 in &successors_list[h2] {
                    if !game.are_distinguishable(player, new_last_states[n1], new_last_states[n2]) {
                        result.push((n1, n2));
                    }
                }
            }
        }
        result
    }

    /// Returns the submodel induced by `histories`, densely renumbered from
    /// `0`. Every player's subgraph is induced on the same vertex set, so
    /// the dense renumbering (driven by sorted old labels) is identical
    /// across players.
    fn induced_submodel(histories: &[usize], last_states: &[StateIndex], indist_graphs: &[UndirectedGraph]) -> EpistemicModel {
        let mut sorted_histories = histories.to_vec();
        sorted_histories.sort_unstable();

        let mut new_graphs = Vec::with_capacity(indist_graphs.len());
        let mut old_labels = sorted_histories.clone();
        for graph in indist_graphs {
            let (dense, labels) = graph.subgraph(&sorted_histories).convert_labels_to_integers();
            old_labels = labels;
            new_graphs.push(dense);
        }

        let sub_last_states = old_labels.iter().map(|&old| last_states[old]).collect();
        EpistemicModel {
            last_states: sub_last_states,
            indist_graphs: new_graphs,
        }
    }
}

/// Like [`partition_preserving`], but for a bijection between two different
/// vertex spaces (the histories of two distinct models): `f` preserves last
/// states iff `left[x] == right[f(x)]` for every `x`, not just the vertices
/// `f` actually moves. A fixed point `f(x) == x` is not a free pass here:
/// unlike a same-model retraction, `x` and `f(x)` index into two different
/// `last_states` sequences, so identical indices need not mean equal states.
fn cross_partition_preserving(mappings: Vec<Mapping>, left: &[StateIndex], right: &[StateIndex]) -> Vec<Mapping> {
    mappings.into_iter().filter(|mapping| (0..left.len()).all(|x| left[x] == right[mapping.apply(x)])).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trivial_game() -> DistributedGame {
        DistributedGame::new(vec!["s0".to_string()], 0, vec![vec!["a".to_string()]], vec![vec![]]).unwrap()
    }

    fn coin_flip_game() -> DistributedGame {
        let mut game = DistributedGame::new(
            vec!["s0".to_string(), "s1".to_string()],
            0,
            vec![vec!["observe".to_string()]],
            vec![vec![vec![0, 1]]],
        )
        .unwrap();
        game.set_move(vec!["observe".to_string()], 0, vec![0, 1]).unwrap();
        game
    }

    fn two_player_sync_game() -> DistributedGame {
        let mut game = DistributedGame::new(
            vec!["s0".to_string(), "s1".to_string()],
            0,
            vec![vec!["a".to_string()], vec!["a".to_string()]],
            vec![vec![], vec![]],
        )
        .unwrap();
        game.set_move(vec!["a".to_string(), "a".to_string()], 0, vec![0, 1]).unwrap();
        game
    }

    #[test]
    fn test_trivial_game_unfolds_to_isomorphic_self() {
        let game = trivial_game();
        let model = EpistemicModel::initial(&game);
        let successors = model.unfold(&game, true);

        assert_eq!(successors.len(), 1);
        assert!(successors[0].0.is_isomorphic(&model));
    }

    #[test]
    fn test_coin_flip_next_joins_both_outcomes_with_one_indist_edge() {
        // Core only collapses histories that share the same underlying game
        // state (see test_core_retracts_dominated_history_onto_dominating_neighbor
        // for that case): here the two outcomes land on different states, so
        // the indistinguishability is recorded as an edge, not a merge.
        let game = coin_flip_game();
        let model = EpistemicModel::initial(&game);
        let joint_actions = vec![vec!["observe".to_string()]];

        let uncored = model.next(&game, &joint_actions, false);
        assert_eq!(uncored.len(), 1);
        assert_eq!(uncored[0].history_count(), 2);
        assert!(uncored[0].indist_graphs[0].has_edge(0, 1));
    }

    #[test]
    fn test_two_player_sync_splits_on_distinguishable_successors() {
        let game = two_player_sync_game();
        let model = EpistemicModel::initial(&game);
        let joint_actions = vec![vec!["a".to_string(), "a".to_string()]];

        let successors = model.next(&game, &joint_actions, false);
        assert_eq!(successors.len(), 2);
        assert!(successors.iter().all(|m| m.history_count() == 1));
    }

    #[test]
    fn test_compatible_action_count_is_actions_to_the_components() {
        let mut game = DistributedGame::new(
            vec!["s0".to_string(), "s1".to_string(), "s2".to_string()],
            0,
            vec![vec!["x".to_string(), "y".to_string()]],
            vec![vec![]],
        )
        .unwrap();
        game.set_move(vec!["x".to_string()], 0, vec![0]).unwrap();

        // Build a model with 3 histories and 2 indist-components for player 0.
        let model = EpistemicModel {
            last_states: vec![StateIndex::new(0), StateIndex::new(1), StateIndex::new(2)],
            indist_graphs: vec![{
                let mut graph = UndirectedGraph::new();
                graph.add_edge(0, 0);
                graph.add_edge(1, 1);
                graph.add_edge(2, 2);
                graph.add_edge(0, 1);
                graph
            }],
        };

        let player = PlayerIndex::new(0);
        let assignments = model.compatible_actions(&game, player);
        // 2 components, 2 actions: 2^2 = 4 assignments.
        assert_eq!(assignments.len(), 4);
    }

    #[test]
    fn test_model_is_isomorphic_to_itself() {
        let game = coin_flip_game();
        let model = EpistemicModel::initial(&game);
        assert!(model.is_isomorphic(&model));
    }

    #[test]
    fn test_isomorphic_via_renaming_and_distinguishing_swap_breaks_it() {
        let mut graph_a = UndirectedGraph::new();
        graph_a.add_edge(0, 0);
        graph_a.add_edge(1, 1);
        graph_a.add_edge(0, 1);

        let mut graph_b = UndirectedGraph::new();
        graph_b.add_edge(0, 0);
        graph_b.add_edge(1, 1);
        graph_b.add_edge(1, 0);

        let model_a = EpistemicModel {
            last_states: vec![StateIndex::new(0), StateIndex::new(1)],
            indist_graphs: vec![graph_a],
        };
        let model_b = EpistemicModel {
            last_states: vec![StateIndex::new(0), StateIndex::new(1)],
            indist_graphs: vec![graph_b],
        };
        assert!(model_a.is_isomorphic(&model_b));

        // Swapping to last states the player can distinguish (0 and 2) breaks it.
        let model_c = EpistemicModel {
            last_states: vec![StateIndex::new(0), StateIndex::new(2)],
            indist_graphs: vec![model_b.indist_graphs[0].clone()],
        };
        assert!(!model_a.is_isomorphic(&model_c));
    }

    #[test]
    fn test_core_retracts_dominated_history_onto_dominating_neighbor() {
        // History 0 and 1 share the same last state and 1's neighborhood is a
        // strict superset of 0's, so 0 retracts onto 1.
        let mut graph = UndirectedGraph::new();
        for v in 0..3 {
            graph.add_edge(v, v);
        }
        graph.add_edge(0, 2);
        graph.add_edge(1, 2);
        graph.add_edge(1, 0);

        let model = EpistemicModel {
            last_states: vec![StateIndex::new(0), StateIndex::new(0), StateIndex::new(1)],
            indist_graphs: vec![graph],
        };

        let core = model.core();
        assert_eq!(core.history_count(), 2);
    }

    #[test]
    fn test_core_finds_a_retraction_that_fixes_the_max_degree_history() {
        // 3 histories sharing one last state. Player 0's graph is a reflexive
        // path (0-1, 1-2); player 1's a reflexive star (0-1, 0-2). History 1
        // has the highest degree in player 0's graph and would be processed
        // first by a degree-descending search, but {1 -> 0, 2 -> 0} is still a
        // valid partition-preserving retraction of both graphs, so the true
        // core has a single history.
        let mut graph_p0 = UndirectedGraph::new();
        for v in 0..3 {
            graph_p0.add_edge(v, v);
        }
        graph_p0.add_edge(0, 1);
        graph_p0.add_edge(1, 2);

        let mut graph_p1 = UndirectedGraph::new();
        for v in 0..3 {
            graph_p1.add_edge(v, v);
        }
        graph_p1.add_edge(0, 1);
        graph_p1.add_edge(0, 2);

        let model = EpistemicModel {
            last_states: vec![StateIndex::new(0), StateIndex::new(0), StateIndex::new(0)],
            indist_graphs: vec![graph_p0, graph_p1],
        };

        let core = model.core();
        assert_eq!(core.history_count(), 1);
    }

    #[test]
    fn test_random_models_have_a_core_that_never_grows_and_is_its_own_core() {
        use epunfold_utilities::random_test;
        use rand::Rng;

        random_test(50, |rng| {
            let history_count = rng.random_range(1..=6);
            let state_count = rng.random_range(1..=3);
            let player_count = rng.random_range(1..=2);

            let last_states: Vec<StateIndex> = (0..history_count).map(|_| StateIndex::new(rng.random_range(0..state_count))).collect();

            let indist_graphs: Vec<UndirectedGraph> = (0..player_count)
                .map(|_| {
                    let mut graph = UndirectedGraph::new();
                    for h in 0..history_count {
                        graph.add_edge(h, h);
                    }
                    for u in 0..history_count {
                        for v in (u + 1)..history_count {
                            if rng.random_bool(0.3) {
                                graph.add_edge(u, v);
                            }
                        }
                    }
                    graph
                })
                .collect();

            let model = EpistemicModel { last_states, indist_graphs };

            let core = model.core();
            assert!(core.history_count() <= model.history_count());

            let double_core = core.core();
            assert!(double_core.is_isomorphic(&core), "a core's own core must be isomorphic to itself");
        });
    }
}
