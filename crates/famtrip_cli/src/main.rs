//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `famtrip_core` linkage without the Flutter runtime.
//! - Seed an in-memory planner and print its ranked board deterministically.

use famtrip_core::db::open_db_in_memory;
use famtrip_core::{CreateActivityRequest, PlannerService, SqliteActivityRepository, VoteType};
use std::error::Error;
use std::process::ExitCode;

const DEMO_GROUP: &str = "demo-family";

fn main() -> ExitCode {
    println!("famtrip_core ping={}", famtrip_core::ping());
    println!("famtrip_core version={}", famtrip_core::core_version());

    match print_demo_board() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("famtrip_cli demo failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_demo_board() -> Result<(), Box<dyn Error>> {
    let mut conn = open_db_in_memory()?;
    let repo = SqliteActivityRepository::try_new(&mut conn)?;
    let mut service = PlannerService::new(repo);

    let seeds = [
        ("Ice cream stop", None, 1_000),
        ("Morning hike", Some(1_700_020_000_000), 2_000),
        ("Aquarium", Some(1_700_010_000_000), 3_000),
        ("Board games", None, 4_000),
    ];
    let mut ids = Vec::with_capacity(seeds.len());
    for (title, scheduled_time, created_at) in seeds {
        let request = CreateActivityRequest {
            group_id: DEMO_GROUP.to_string(),
            title: title.to_string(),
            scheduled_time,
            ..CreateActivityRequest::default()
        };
        ids.push(service.create_activity_at(request, created_at)?.id);
    }
    service.cast_vote(ids[0], "kid", VoteType::Yes)?;
    service.cast_vote(ids[0], "dad", VoteType::Maybe)?;
    service.cast_vote(ids[2], "mom", VoteType::No)?;

    for (rank, entry) in service.board(DEMO_GROUP)?.entries.iter().enumerate() {
        println!(
            "#{} {} yes={} no={} maybe={} yes_ratio={:.2}",
            rank + 1,
            entry.activity.title,
            entry.tally.yes_count,
            entry.tally.no_count,
            entry.tally.maybe_count,
            entry.tally.yes_ratio
        );
    }
    Ok(())
}
