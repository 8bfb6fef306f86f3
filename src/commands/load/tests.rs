use std::fs;
use std::path::Path;

use rusqlite::Connection;

use super::*;
use crate::model::{Base, LoadConfig};
use crate::table::Frame;

fn frame(headers: &[&str], rows: &[&[&str]]) -> Frame {
    Frame {
        headers: headers.iter().map(ToString::to_string).collect(),
        rows: rows
            .iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect(),
    }
}

fn column_values(table: &Frame, name: &str) -> Vec<String> {
    let index = table.column(name).expect("column present");
    table.rows.iter().map(|row| row[index].clone()).collect()
}

fn write_file(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
    fs::write(path, content).expect("write file");
}

fn test_config(root: &Path) -> LoadConfig {
    LoadConfig {
        data_root: root.join("data"),
        sport_dir: "sport_1".to_string(),
        db_path: root.join("out.sqlite"),
        manifest_dir: root.join("manifests"),
        batch_size: 1000,
    }
}

#[test]
fn base_normalization_collapses_synonyms_and_is_idempotent() {
    for raw in ["1B", "First", "1", "first base"] {
        assert_eq!(Base::normalize(raw), Base::First, "raw {raw:?}");
    }
    for raw in ["2B", "second", "2"] {
        assert_eq!(Base::normalize(raw), Base::Second, "raw {raw:?}");
    }
    for raw in ["3B", "Third", "3"] {
        assert_eq!(Base::normalize(raw), Base::Third, "raw {raw:?}");
    }
    for raw in ["HM", "score", "Home", "scored"] {
        assert_eq!(Base::normalize(raw), Base::Home, "raw {raw:?}");
    }
    for raw in ["", "  ", "B", "batter"] {
        assert_eq!(Base::normalize(raw), Base::AtBat, "raw {raw:?}");
    }

    for raw in ["1B", "First", "score", "HM", "B", "", "something else"] {
        let once = Base::normalize(raw);
        assert_eq!(Base::normalize(once.as_str()), once, "raw {raw:?}");
    }
}

#[test]
fn score_reconstruction_records_pre_half_inning_scores() {
    // Source order is deliberately shuffled; (inning, half) is chronology.
    let linescores = frame(
        &["gamePk", "inning", "half", "battingteamid", "runs"],
        &[
            &["100", "2", "top", "10", "0"],
            &["100", "1", "top", "10", "1"],
            &["100", "3", "top", "10", "2"],
            &["100", "1", "bottom", "11", "0"],
            &["100", "2", "bottom", "11", "1"],
        ],
    );

    let reconstructed = reconstruct_game_linescore(100, &linescores).expect("reconstruct");

    assert_eq!(
        column_values(&reconstructed, "battingteamid"),
        vec!["10", "11", "10", "11", "10"]
    );
    assert_eq!(
        column_values(&reconstructed, "battingteam_score"),
        vec!["0", "0", "1", "0", "1"]
    );
    assert_eq!(
        column_values(&reconstructed, "battingteam_score_diff"),
        vec!["0", "-1", "1", "-1", "0"]
    );
}

#[test]
fn score_reconstruction_is_a_shifted_prefix_sum() {
    let linescores = frame(
        &["gamePk", "inning", "half", "battingteamid", "runs"],
        &[
            &["7", "1", "0", "1", "3"],
            &["7", "1", "1", "2", "0"],
            &["7", "2", "0", "1", "4"],
            &["7", "2", "1", "2", "2"],
            &["7", "3", "0", "1", "1"],
            &["7", "3", "1", "2", "0"],
        ],
    );

    let reconstructed = reconstruct_game_linescore(7, &linescores).expect("reconstruct");
    let scores = column_values(&reconstructed, "battingteam_score");

    // Team 1 bats in even positions: prefix sums of [3, 4, 1] shifted by one.
    assert_eq!(scores[0], "0");
    assert_eq!(scores[2], "3");
    assert_eq!(scores[4], "7");
    // Team 2: prefix sums of [0, 2, 0] shifted by one.
    assert_eq!(scores[1], "0");
    assert_eq!(scores[3], "0");
    assert_eq!(scores[5], "2");
}

#[test]
fn linescore_with_wrong_team_count_is_dropped() {
    let three_teams = frame(
        &["gamePk", "inning", "half", "battingteamid", "runs"],
        &[
            &["5", "1", "top", "1", "0"],
            &["5", "1", "bottom", "2", "1"],
            &["5", "2", "top", "3", "0"],
        ],
    );
    assert!(reconstruct_game_linescore(5, &three_teams).is_err());

    let one_team = frame(
        &["gamePk", "inning", "half", "battingteamid", "runs"],
        &[&["5", "1", "top", "1", "0"]],
    );
    assert!(reconstruct_game_linescore(5, &one_team).is_err());
}

#[test]
fn unparseable_runs_invalidate_the_game() {
    let linescores = frame(
        &["gamePk", "inning", "half", "battingteamid", "runs"],
        &[
            &["5", "1", "top", "1", "x"],
            &["5", "1", "bottom", "2", "0"],
        ],
    );
    assert!(reconstruct_game_linescore(5, &linescores).is_err());
}

const RUNNER_HEADERS: [&str; 11] = [
    "gamePk",
    "atBatIndex",
    "playIndex",
    "runnerid",
    "playId",
    "runnerfullName",
    "isOut",
    "event",
    "movementReason",
    "start",
    "end",
];

#[test]
fn runner_flags_follow_base_movement() {
    let runners = frame(
        &RUNNER_HEADERS,
        &[
            &["9", "0", "1", "500", "p1", "A", "False", "Single", "adv", "1B", "3B"],
            &["9", "1", "1", "501", "p2", "B", "False", "Double", "adv", "2B", "score"],
            &["9", "2", "1", "502", "p3", "C", "False", "Groundout", "adv", "", "1B"],
        ],
    );

    let normalized = normalize_game_runners(9, &runners).expect("normalize");

    assert_eq!(column_values(&normalized, "startbase"), vec!["1B", "2B", "B"]);
    assert_eq!(column_values(&normalized, "endbase"), vec!["3B", "HM", "1B"]);
    assert_eq!(
        column_values(&normalized, "reachedbase"),
        column_values(&normalized, "endbase")
    );
    assert_eq!(column_values(&normalized, "is_risp"), vec!["0", "1", "0"]);
    assert_eq!(
        column_values(&normalized, "is_firsttothird"),
        vec!["1", "0", "0"]
    );
    assert_eq!(
        column_values(&normalized, "is_secondtohome"),
        vec!["0", "1", "0"]
    );
}

#[test]
fn home_run_suppresses_advancement_flags() {
    let runners = frame(
        &RUNNER_HEADERS,
        &[
            &["9", "0", "1", "500", "p1", "A", "False", "Home Run", "", "1B", "3B"],
            &["9", "1", "1", "501", "p2", "B", "False", "homerun", "", "2B", "home"],
        ],
    );

    let normalized = normalize_game_runners(9, &runners).expect("normalize");

    assert_eq!(column_values(&normalized, "is_firsttothird"), vec!["0", "0"]);
    assert_eq!(column_values(&normalized, "is_secondtohome"), vec!["0", "0"]);
    // RISP only depends on the start base, home run or not.
    assert_eq!(column_values(&normalized, "is_risp"), vec!["0", "1"]);
}

#[test]
fn dedicated_start_column_overrides_origin_base() {
    let both = frame(
        &[
            "gamePk", "atBatIndex", "playIndex", "runnerid", "playId", "runnerfullName",
            "isOut", "event", "movementReason", "originBase", "start", "end",
        ],
        &[&["9", "0", "1", "500", "p1", "A", "False", "Single", "", "2B", "1B", "2B"]],
    );
    let normalized = normalize_game_runners(9, &both).expect("normalize");
    assert_eq!(column_values(&normalized, "startbase"), vec!["1B"]);

    let origin_only = frame(
        &[
            "gamePk", "atBatIndex", "playIndex", "runnerid", "playId", "runnerfullName",
            "isOut", "event", "movementReason", "originBase", "end",
        ],
        &[&["9", "0", "1", "500", "p1", "A", "False", "Single", "", "2B", "3B"]],
    );
    let normalized = normalize_game_runners(9, &origin_only).expect("normalize");
    assert_eq!(column_values(&normalized, "startbase"), vec!["2B"]);
}

#[test]
fn runner_dedup_keeps_last_occurrence() {
    let mut runners = frame(
        &RUNNER_OUTPUT_COLUMNS,
        &[
            &["9", "0", "1", "500", "p1", "A", "B", "3B", "3B", "False", "Single", "", "0", "0", "0"],
            &["9", "5", "1", "501", "p2", "B", "B", "1B", "1B", "False", "Walk", "", "0", "0", "0"],
            &["9", "0", "1", "500", "p1", "A", "B", "3B", "3B", "True", "Single", "", "0", "0", "0"],
        ],
    );

    let dropped = dedup_keep_last(&mut runners, &RUNNER_KEY_COLUMNS).expect("dedup");

    assert_eq!(dropped, 1);
    assert_eq!(runners.rows.len(), 2);
    assert_eq!(column_values(&runners, "is_out"), vec!["False", "True"]);
}

#[test]
fn later_date_wins_for_duplicate_gamepk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path());

    write_file(
        &config.data_root.join("2025-07-01/sport_1/games.csv"),
        "gamePk,venue\n100,Fenway Park\n",
    );
    write_file(
        &config.data_root.join("2025-07-02/sport_1/games.csv"),
        "gamePk,venue\n100,Fenway Park\n",
    );

    let mut warnings = Vec::new();
    let discovery = locate_games(&config, &mut warnings).expect("locate");

    assert_eq!(discovery.sources.len(), 1);
    assert_eq!(discovery.sources[&100].date_folder, "2025-07-02");
    assert_eq!(discovery.date_folders_scanned, 2);
}

#[test]
fn dates_without_usable_games_files_are_skipped() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path());

    // No games.csv at all.
    fs::create_dir_all(config.data_root.join("2025-07-01/sport_1")).expect("mkdir");
    // Headers but zero rows.
    write_file(
        &config.data_root.join("2025-07-02/sport_1/games.csv"),
        "gamePk,venue\n",
    );
    // A usable date.
    write_file(
        &config.data_root.join("2025-07-03/sport_1/games.csv"),
        "gamePk,venue\n200,Wrigley Field\n",
    );

    let mut warnings = Vec::new();
    let discovery = locate_games(&config, &mut warnings).expect("locate");

    assert_eq!(discovery.sources.len(), 1);
    assert!(discovery.sources.contains_key(&200));
    assert_eq!(discovery.date_folders_skipped, 2);
    assert_eq!(warnings.len(), 2);
}

#[test]
fn unlistable_root_is_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path());

    assert!(locate_games(&config, &mut Vec::new()).is_err());
}

#[test]
fn load_two_date_folders_end_to_end() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path());

    // Date 1: a fully valid game.
    write_file(
        &config.data_root.join("2025-07-01/sport_1/games.csv"),
        "gamePk,venue\n100,Fenway Park\n",
    );
    write_file(
        &config.data_root.join("2025-07-01/sport_1/linescores.csv"),
        "gamePk,inning,half,battingteamid,runs\n\
         100,2,top,10,0\n\
         100,1,top,10,1\n\
         100,3,top,10,2\n\
         100,1,bottom,11,0\n\
         100,2,bottom,11,1\n",
    );
    write_file(
        &config.data_root.join("2025-07-01/sport_1/runners.csv"),
        "gamePk,atBatIndex,playIndex,runnerid,playId,runnerfullName,isOut,event,movementReason,start,end\n\
         100,0,1,500,p1,Jeter,False,Single,advance,1B,3B\n\
         100,0,1,500,p1,Jeter,True,Single,advance,1B,3B\n\
         100,3,2,501,p2,Smith,False,Home Run,,2B,score\n",
    );

    // Date 2: linescore has three batting teams and the runners file is
    // empty, so only the game row survives.
    write_file(
        &config.data_root.join("2025-07-02/sport_1/games.csv"),
        "gamePk,venue\n200,Wrigley Field\n",
    );
    write_file(
        &config.data_root.join("2025-07-02/sport_1/linescores.csv"),
        "gamePk,inning,half,battingteamid,runs\n\
         200,1,top,20,0\n\
         200,1,bottom,21,1\n\
         200,2,top,22,0\n",
    );
    write_file(
        &config.data_root.join("2025-07-02/sport_1/runners.csv"),
        "gamePk,atBatIndex,playIndex,runnerid,playId,runnerfullName,isOut,event,movementReason,start,end\n",
    );

    let counts = execute(&config).expect("execute");

    assert_eq!(counts.games_discovered, 2);
    assert_eq!(counts.game_rows_loaded, 2);
    assert_eq!(counts.linescore_rows_loaded, 5);
    assert_eq!(counts.linescore_games_skipped, 1);
    assert_eq!(counts.runner_rows_loaded, 2);
    assert_eq!(counts.runner_duplicate_rows_dropped, 1);

    let connection = Connection::open(&config.db_path).expect("open db");
    let games: i64 = connection
        .query_row("SELECT COUNT(*) FROM game", [], |row| row.get(0))
        .expect("count games");
    assert_eq!(games, 2);

    let scores: Vec<String> = connection
        .prepare("SELECT battingteam_score FROM linescore")
        .expect("prepare")
        .query_map([], |row| row.get(0))
        .expect("query")
        .collect::<Result<_, _>>()
        .expect("collect");
    assert_eq!(scores, vec!["0", "0", "1", "0", "1"]);

    // The deduplicated runner row is the later-supplied one.
    let is_out: String = connection
        .query_row(
            "SELECT is_out FROM runner_play WHERE atbatindex = '0'",
            [],
            |row| row.get(0),
        )
        .expect("query is_out");
    assert_eq!(is_out, "True");

    let second_to_home: String = connection
        .query_row(
            "SELECT is_secondtohome FROM runner_play WHERE atbatindex = '3'",
            [],
            |row| row.get(0),
        )
        .expect("query flag");
    assert_eq!(second_to_home, "0");

    assert!(
        fs::read_dir(&config.manifest_dir)
            .expect("list manifests")
            .count()
            > 0
    );

    // Append-only semantics: a second run duplicates every row.
    execute(&config).expect("second run");
    let games: i64 = connection
        .query_row("SELECT COUNT(*) FROM game", [], |row| row.get(0))
        .expect("count games");
    assert_eq!(games, 4);
}

#[test]
fn empty_discovery_skips_the_sink_entirely() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path());

    fs::create_dir_all(config.data_root.join("2025-07-01/sport_1")).expect("mkdir");

    let counts = execute(&config).expect("execute");
    assert_eq!(counts.games_discovered, 0);

    let connection = Connection::open(&config.db_path).expect("open db");
    let tables: i64 = connection
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('game', 'linescore', 'runner_play')",
            [],
            |row| row.get(0),
        )
        .expect("count tables");
    assert_eq!(tables, 0);
}

#[test]
fn sink_appends_in_batches_and_evolves_columns() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = dir.path().join("sink.sqlite");

    let mut sink = Sink::open(&db_path, 2).expect("open sink");

    let first = frame(&["gamePk", "venue"], &[&["1", "a"], &["2", "b"], &["3", ""]]);
    assert_eq!(sink.append_frame("game", &first).expect("append"), 3);

    // A later batch may carry a column the table has not seen yet.
    let second = frame(&["gamePk", "attendance"], &[&["4", "100"]]);
    assert_eq!(sink.append_frame("game", &second).expect("append"), 1);

    assert_eq!(sink.count_rows("game").expect("count"), 4);

    let connection = Connection::open(&db_path).expect("open db");
    let empty_venues: i64 = connection
        .query_row(
            "SELECT COUNT(*) FROM game WHERE venue IS NULL",
            [],
            |row| row.get(0),
        )
        .expect("count nulls");
    // The empty cell and the row from the frame without a venue column.
    assert_eq!(empty_venues, 2);
}
