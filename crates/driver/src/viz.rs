//! Renders games and unfolded model graphs as Graphviz DOT text. Producing
//! the `.png` from the `.dot` is left to the `dot` binary, invoked by the
//! CLI; this module only ever writes text.

use std::fmt::Write as _;

use ahash::AHashMap;
use epunfold_game::DistributedGame;
use epunfold_model::EpistemicModel;

use crate::LocationGraph;

const STYLES: [&str; 3] = ["dashed", "dotted", "bold"];
const COLORS: [&str; 4] = ["red", "blue", "darkgreen", "purple4"];

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Joins `labels` the way the unfolder's edge labels are wrapped: sorted,
/// comma-separated, with a newline inserted every `⌈√n⌉` entries.
fn wrap_labels(mut labels: Vec<String>) -> String {
    if labels.is_empty() {
        return String::new();
    }
    labels.sort();

    let sqrt = (labels.len() as f64).sqrt().ceil() as usize;
    let mut out = labels[0].clone();
    for (i, label) in labels.iter().enumerate().skip(1) {
        out.push(',');
        out.push(if i % sqrt == 0 { '\n' } else { ' ' });
        out.push_str(label);
    }
    out
}

fn joint_action_label(joint_action: &[String]) -> String {
    format!("({})", joint_action.join(","))
}

/// One transition-compatible assignment is one joint action per history;
/// its label joins each history's joint-action label with `|`.
fn assignment_label(assignment: &[Vec<String>]) -> String {
    assignment.iter().map(|joint_action| joint_action_label(joint_action)).collect::<Vec<_>>().join("|")
}

/// Renders the base game: states as nodes, the move relation as labeled
/// directed edges (collapsed per `from, to` pair, `⊥` if the source has a
/// single outgoing edge), per-player indistinguishability as colored/styled
/// undirected edges, and an arrow from an invisible node into the initial
/// state.
pub fn render_game_dot(game: &DistributedGame) -> String {
    let mut collapsed: AHashMap<(usize, usize), Vec<String>> = AHashMap::new();
    for (joint_action, from_state, destinations) in game.all_moves() {
        for to_state in destinations {
            collapsed.entry((from_state.value(), to_state.value())).or_default().push(joint_action_label(&joint_action));
        }
    }
    let mut out_count: AHashMap<usize, usize> = AHashMap::new();
    for &(from_state, _) in collapsed.keys() {
        *out_count.entry(from_state).or_default() += 1;
    }

    let mut out = String::new();
    let _ = writeln!(out, "digraph {{");

    let mut edges: Vec<(&(usize, usize), &Vec<String>)> = collapsed.iter().collect();
    edges.sort_by_key(|(key, _)| **key);
    for (&(from_state, to_state), actions) in edges {
        let label = if out_count[&from_state] == 1 { "\u{22a5}".to_string() } else { wrap_labels(actions.clone()) };
        let _ = writeln!(
            out,
            "  \"{}\" -> \"{}\" [label=\"{}\"];",
            escape(game.state_name(epunfold_game::StateIndex::new(from_state))),
            escape(game.state_name(epunfold_game::StateIndex::new(to_state))),
            escape(&label)
        );
    }

    let initial_name = game.state_name(game.initial_state());
    let _ = writeln!(out, "  hidden_initial [shape=none, label=\"\"];");
    let _ = writeln!(out, "  hidden_initial -> \"{}\";", escape(initial_name));

    for (player_index, player) in game.players().enumerate() {
        let style = STYLES[player_index % STYLES.len()];
        let color = COLORS[player_index % COLORS.len()];
        for (u, v) in game.indist_graph(player).edges() {
            if u == v {
                continue;
            }
            let u_name = game.state_name(epunfold_game::StateIndex::new(u));
            let v_name = game.state_name(epunfold_game::StateIndex::new(v));
            let _ = writeln!(
                out,
                "  \"{}\" -> \"{}\" [dir=none, style={}, color={}];",
                escape(u_name),
                escape(v_name),
                style,
                color
            );
        }
    }

    out.push_str("}\n");
    out
}

/// Renders a single model's indistinguishability graph: one node per
/// history, labeled with its last game state, and colored/styled
/// undirected edges per player.
pub fn render_model_dot(model: &EpistemicModel, game: &DistributedGame) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "graph {{");

    for (history, &state) in model.last_states().iter().enumerate() {
        let _ = writeln!(out, "  {} [label=\"{}\"];", history, escape(game.state_name(state)));
    }

    for player in 0..model.player_count() {
        let style = STYLES[player % STYLES.len()];
        let color = COLORS[player % COLORS.len()];
        for (u, v) in model.indist_graph(epunfold_game::PlayerIndex::new(player)).edges() {
            if u == v {
                continue;
            }
            let _ = writeln!(out, "  {u} -- {v} [style={style}, color={color}];");
        }
    }

    out.push_str("}\n");
    out
}

/// Renders the unfolding driver's discovered locations as a digraph, one
/// node per model (expected to carry an `image=` attribute pointing at a
/// pre-rendered [`render_model_dot`] PNG) and one edge per transition,
/// labeled with the joint-action assignments that induce it.
pub fn render_location_graph_dot(graph: &LocationGraph, initial_index: usize, model_image_paths: &[String]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph {{");

    for (index, path) in model_image_paths.iter().enumerate() {
        let _ = writeln!(out, "  {index} [label=\"\", shape=box, image=\"{}\"];", escape(path));
    }

    let mut out_count: AHashMap<usize, usize> = AHashMap::new();
    for &(from_index, _) in graph.transitions.keys() {
        *out_count.entry(from_index).or_default() += 1;
    }

    let mut edges: Vec<_> = graph.transitions.iter().collect();
    edges.sort_by_key(|(key, _)| **key);
    for (&(from_index, to_index), assignments) in edges {
        let label = if out_count[&from_index] == 1 {
            "\u{22a5}".to_string()
        } else {
            let labels = assignments.iter().map(|assignment| assignment_label(assignment)).collect();
            wrap_labels(labels)
        };
        let _ = writeln!(out, "  {from_index} -> {to_index} [label=\"{}\"];", escape(&label));
    }

    let _ = writeln!(out, "  hidden_initial [shape=none, label=\"\"];");
    let _ = writeln!(out, "  hidden_initial -> {initial_index};");

    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_state_coin_flip() -> DistributedGame {
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

    #[test]
    fn test_wrap_labels_is_empty_for_no_labels() {
        assert_eq!(wrap_labels(Vec::new()), "");
    }

    #[test]
    fn test_wrap_labels_single_label_has_no_separators() {
        assert_eq!(wrap_labels(vec!["(a)".to_string()]), "(a)");
    }

    #[test]
    fn test_wrap_labels_sorts_before_joining() {
        let wrapped = wrap_labels(vec!["(b)".to_string(), "(a)".to_string()]);
        assert!(wrapped.starts_with("(a),"));
    }

    #[test]
    fn test_render_game_dot_contains_initial_arrow_and_state_nodes() {
        let game = two_state_coin_flip();
        let dot = render_game_dot(&game);
        assert!(dot.contains("hidden_initial -> \"s0\""));
        assert!(dot.contains("\"s0\""));
        assert!(dot.contains("\"s1\""));
    }

    #[test]
    fn test_render_model_dot_labels_histories_by_last_state() {
        let game = two_state_coin_flip();
        let model = EpistemicModel::initial(&game);
        let dot = render_model_dot(&model, &game);
        assert!(dot.contains("0 [label=\"s0\"]"));
    }
}
