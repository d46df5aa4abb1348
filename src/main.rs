use gridsync::game::clock::SCHEDULE_LEAD_S;
use gridsync::game::parsing::{parse_simfile, Difficulty};
use gridsync::game::session::{LaneSet, Session};

/// Headless demo: parse a simfile, autoplay it with frame-perfect
/// presses, and print the result summary as JSON.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .try_init();

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .ok_or("usage: gridsync <simfile> [difficulty]")?;
    let difficulty = match args.next() {
        Some(name) => Difficulty::from_name(&name)
            .ok_or_else(|| format!("unknown difficulty: {name}"))?,
        None => Difficulty::Medium,
    };

    let text = std::fs::read_to_string(&path)?;
    let chart = parse_simfile(&text, difficulty)?;
    log::info!("Loaded {path}: {} notes", chart.note_count());

    // Coalesce same-instant notes into one input snapshot per tick.
    let mut presses: Vec<(f64, LaneSet)> = Vec::new();
    for note in &chart.notes {
        match presses.last_mut() {
            Some((time, set)) if (*time - note.time_sec).abs() < 1e-9 => {
                *set |= LaneSet::from_lane(note.lane);
            }
            _ => presses.push((note.time_sec, LaneSet::from_lane(note.lane))),
        }
    }

    let offset = chart.offset_sec;
    let mut session = Session::new(chart);
    let start = SCHEDULE_LEAD_S;
    session.arm(start, 0.0);
    // The clock subtracts the chart offset, so a note at song time `t`
    // is on the judge line at audio time `start + t + offset`.
    let mut clock = start;
    for (time, set) in presses {
        clock = clock.max(start + time + offset);
        session.tick(clock, set);
    }
    while !session.is_finished() {
        clock += 0.1;
        session.tick(clock, LaneSet::empty());
    }

    let summary = session.finalize().ok_or("session already finalized")?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
