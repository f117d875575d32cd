use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;

use ahash::AHashMap;
use log::info;
use streaming_iterator::StreamingIterator;
use thiserror::Error;

use crate::GameAccessError;
use crate::GameConstructionError;
use crate::DistributedGame;
use crate::JointAction;

#[derive(Error, Debug)]
pub enum GameFileError {
    #[error("unexpected end of file: expected the {0} section")]
    MissingSection(&'static str),

    #[error("location line {0:?} is not of the form '<index> = <name>'")]
    InvalidLocationLine(String),

    #[error("location indices must range from 0 to n-1, but index {0} is out of range for {1} locations")]
    LocationIndexOutOfRange(usize, usize),

    #[error("location index {0} is used more than once")]
    DuplicateLocationIndex(usize),

    #[error("expected the initial location line")]
    MissingInitialLocation,

    #[error("transition line {0:?} does not have the form '<from> <a0,a1,...> <to>'")]
    InvalidTransitionLine(String),

    #[error("action index {0} in transition line {1:?} is out of range for {2} known actions")]
    ActionIndexOutOfRange(usize, String, usize),

    #[error(transparent)]
    InvalidInteger(#[from] std::num::ParseIntError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Construction(#[from] GameConstructionError),

    #[error(transparent)]
    Access(#[from] GameAccessError),
}

/// A lending iterator over the stripped, non-empty-trimmed lines of a
/// reader: each line has its trailing newline removed and is then trimmed of
/// leading/trailing whitespace, matching the section-oriented text format's
/// whitespace tolerance.
struct LineIterator<T: Read> {
    reader: BufReader<T>,
    buffer: String,
    line: String,
    end: bool,
}

impl<T: Read> LineIterator<T> {
    fn new(reader: T) -> Self {
        LineIterator {
            reader: BufReader::new(reader),
            buffer: String::new(),
            line: String::new(),
            end: false,
        }
    }
}

impl<T: Read> StreamingIterator for LineIterator<T> {
    type Item = String;

    fn advance(&mut self) {
        self.buffer.clear();
        match self.reader.read_line(&mut self.buffer) {
            Ok(0) => self.end = true,
            Ok(_) => self.line = self.buffer.trim().to_string(),
            Err(_) => self.end = true,
        }
    }

    fn get(&self) -> Option<&Self::Item> {
        if self.end { None } else { Some(&self.line) }
    }
}

/// Loads a distributed game from the section-oriented text format: actions,
/// locations, initial location, observations, transitions, each section
/// introduced by a discarded header line and terminated by a blank line.
pub fn load_game(reader: impl Read) -> Result<DistributedGame, GameFileError> {
    info!("Reading distributed game...");

    let mut lines = LineIterator::new(reader);
    let actions_table = read_actions(&mut lines)?;
    let locations = read_locations(&mut lines)?;
    let initial_location = read_initial_location(&mut lines)?;
    let observations_table = read_observations(&mut lines)?;
    let transitions = read_transitions(&mut lines, &actions_table)?;

    let mut game = DistributedGame::new(locations, initial_location, actions_table, observations_table)?;
    for ((joint_action, from_state), destinations) in transitions {
        game.set_move(joint_action, from_state, destinations)?;
    }

    info!(
        "Distributed game has {} states and {} players",
        game.num_of_states(),
        game.num_of_players()
    );
    Ok(game)
}

fn read_actions(lines: &mut LineIterator<impl Read>) -> Result<Vec<Vec<String>>, GameFileError> {
    lines.next().ok_or(GameFileError::MissingSection("actions"))?;

    let mut actions_table = Vec::new();
    while let Some(line) = lines.next() {
        if line.is_empty() {
            break;
        }
        let actions = line
            .split(',')
            .map(|action| action.trim().trim_matches(['\'', '"']).to_string())
            .collect();
        actions_table.push(actions);
    }
    Ok(actions_table)
}

fn read_locations(lines: &mut LineIterator<impl Read>) -> Result<Vec<String>, GameFileError> {
    lines.next().ok_or(GameFileError::MissingSection("locations"))?;

    let mut locations: AHashMap<usize, String> = AHashMap::new();
    while let Some(line) = lines.next() {
        if line.is_empty() {
            break;
        }
        let mut parts = line.splitn(2, '=');
        let index_part = parts.next().ok_or_else(|| GameFileError::InvalidLocationLine(line.clone()))?;
        let name_part = parts.next().ok_or_else(|| GameFileError::InvalidLocationLine(line.clone()))?;

        let index: usize = index_part.trim().parse()?;
        let name = name_part.trim().trim_matches(['\'', '"']).to_string();

        if locations.insert(index, name).is_some() {
            return Err(GameFileError::DuplicateLocationIndex(index));
        }
    }

    let count = locations.len();
    let mut ordered = Vec::with_capacity(count);
    for index in 0..count {
        match locations.remove(&index) {
            Some(name) => ordered.push(name),
            None => return Err(GameFileError::LocationIndexOutOfRange(index, count)),
        }
    }
    if let Some(&stray) = locations.keys().next() {
        return Err(GameFileError::LocationIndexOutOfRange(stray, count));
    }
    Ok(ordered)
}

fn read_initial_location(lines: &mut LineIterator<impl Read>) -> Result<usize, GameFileError> {
    let line = lines.next().ok_or(GameFileError::MissingInitialLocation)?.clone();
    lines.next();

    let token = line.split_whitespace().last().ok_or(GameFileError::MissingInitialLocation)?;
    Ok(token.parse()?)
}

fn read_observations(lines: &mut LineIterator<impl Read>) -> Result<Vec<Vec<Vec<usize>>>, GameFileError> {
    lines.next().ok_or(GameFileError::MissingSection("observations"))?;

    let mut observations_table = Vec::new();
    while let Some(line) = lines.next() {
        if line.is_empty() {
            break;
        }
        let mut classes = Vec::new();
        for part in line.split('|') {
            let mut class = Vec::new();
            for state in part.split(',') {
                class.push(state.trim().parse()?);
            }
            classes.push(class);
        }
        observations_table.push(classes);
    }
    Ok(observations_table)
}

fn read_transitions(
    lines: &mut LineIterator<impl Read>,
    actions_table: &[Vec<String>],
) -> Result<AHashMap<(JointAction, usize), Vec<usize>>, GameFileError> {
    lines.next().ok_or(GameFileError::MissingSection("transitions"))?;

    let all_actions: Vec<String> = actions_table.iter().flatten().cloned().collect();

    let mut transitions: AHashMap<(JointAction, usize), Vec<usize>> = AHashMap::new();
    while let Some(line) = lines.next() {
        if line.is_empty() {
            break;
        }
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.len() != 3 {
            return Err(GameFileError::InvalidTransitionLine(line.clone()));
        }

        let from_state: usize = words[0].parse()?;
        let to_state: usize = words[2].parse()?;

        let mut joint_action = Vec::new();
        for index_str in words[1].split(',') {
            let index: usize = index_str.trim().parse()?;
            let action = all_actions
                .get(index)
                .ok_or_else(|| GameFileError::ActionIndexOutOfRange(index, line.clone(), all_actions.len()))?;
            joint_action.push(action.clone());
        }

        let destinations = transitions.entry((joint_action, from_state)).or_default();
        if !destinations.contains(&to_state) {
            destinations.push(to_state);
        }
    }
    Ok(transitions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn coin_flip_file() -> &'static str {
        indoc! {"
            actions
            observe

            locations
            0 = s0
            1 = s1

            initial location 0

            observations
            0,1

            transitions
            0 0 0
            0 0 1
            1 0 1
        "}
    }

    #[test]
    fn test_load_game_reads_coin_flip() {
        let game = load_game(coin_flip_file().as_bytes()).unwrap();
        assert_eq!(game.num_of_states(), 2);
        assert_eq!(game.num_of_players(), 1);
        assert_eq!(game.state_names(), &["s0".to_string(), "s1".to_string()]);
    }

    #[test]
    fn test_load_game_populates_transitions() {
        let game = load_game(coin_flip_file().as_bytes()).unwrap();
        let mut dest = game.get_move(&vec!["observe".to_string()], 0).unwrap();
        dest.sort();
        assert_eq!(dest.len(), 2);
    }

    #[test]
    fn test_load_game_applies_indistinguishability() {
        let game = load_game(coin_flip_file().as_bytes()).unwrap();
        let player = crate::PlayerIndex::new(0);
        assert!(!game.are_distinguishable(player, crate::StateIndex::new(0), crate::StateIndex::new(1)));
    }

    #[test]
    fn test_missing_section_fails_with_diagnostic() {
        let result = load_game("".as_bytes());
        assert!(matches!(result, Err(GameFileError::MissingSection("actions"))));
    }

    #[test]
    fn test_non_covering_location_indices_fail() {
        let file = indoc! {"
            actions
            a

            locations
            0 = s0
            2 = s2

            initial location 0

            observations
            0

            transitions
            0 0 0
        "};
        let result = load_game(file.as_bytes());
        assert!(matches!(result, Err(GameFileError::LocationIndexOutOfRange(_, _))));
    }

    #[test]
    fn test_out_of_range_observation_state_fails() {
        let file = indoc! {"
            actions
            a

            locations
            0 = s0
            1 = s1

            initial location 0

            observations
            0,5

            transitions
            0 0 0
        "};
        let result = load_game(file.as_bytes());
        assert!(matches!(
            result,
            Err(GameFileError::Construction(GameConstructionError::IndistinguishableStateOutOfRange(0, 5)))
        ));
    }

    #[test]
    fn test_duplicate_location_index_fails() {
        let file = indoc! {"
            actions
            a

            locations
            0 = s0
            0 = s0again

            initial location 0

            observations
            0

            transitions
            0 0 0
        "};
        let result = load_game(file.as_bytes());
        assert!(matches!(result, Err(GameFileError::DuplicateLocationIndex(0))));
    }
}
