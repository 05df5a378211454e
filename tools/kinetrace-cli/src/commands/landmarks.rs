//! Print the landmark registry and the body segment table.

use kinetrace_pose_model::{BodySegment, LandmarkIndex, COG_HEIGHT_WEIGHTS};

pub fn run() -> anyhow::Result<()> {
    println!("Landmarks:");
    for landmark in LandmarkIndex::ALL {
        println!(
            "  {:>2}  {:<18} {}",
            landmark.index(),
            landmark.name(),
            landmark.segment().name()
        );
    }
    println!();

    println!("Segments (mass %):");
    let mut total = 0.0;
    for segment in BodySegment::ALL {
        let members = segment
            .landmarks()
            .map(|l| l.index().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {:<16} {:>6.3}  [{}]", segment.name(), segment.weight(), members);
        total += segment.weight();
    }
    println!("  {:<16} {:>6.3}", "total", total);
    println!();

    println!("Center-of-gravity height weights:");
    for (landmark, weight) in COG_HEIGHT_WEIGHTS {
        println!("  {:<18} {:.1}", landmark.name(), weight);
    }

    Ok(())
}
