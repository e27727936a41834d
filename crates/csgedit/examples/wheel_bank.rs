//! A shared wheel placed four times, flattened with xpush.

use csgedit::{world_solids, xpush, EditConfig};
use csgedit_db::{Combination, Database, Leaf, ObjectStore, Transform};
use csgedit_math::{Point3, Vec3};
use csgedit_primitives::{make_rcc, make_torus};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Database::new();

    // One wheel: a hub and a tire, both around the z axis
    db.put_solid("hub", make_rcc(Point3::origin(), Vec3::new(0.0, 0.0, 2.0), 3.0))?;
    db.put_solid("tire", make_torus(Point3::new(0.0, 0.0, 1.0), Vec3::z(), 5.0, 1.5))?;
    db.put_comb("wheel", Combination::region(vec![Leaf::new("hub"), Leaf::new("tire")]))?;

    // Four corners of a chassis, all referencing the same wheel
    let corners = [(-20.0, -12.0), (20.0, -12.0), (-20.0, 12.0), (20.0, 12.0)];
    let leaves = corners
        .iter()
        .map(|(x, y)| {
            let stand_up = Transform::rotation_x(std::f64::consts::FRAC_PI_2);
            Leaf::new("wheel").with_matrix(Transform::translation(*x, *y, 0.0).then(&stand_up))
        })
        .collect();
    db.put_comb("chassis", Combination::new(leaves))?;

    let config = EditConfig::default();
    let chassis = db.lookup("chassis").ok_or("chassis missing")?;
    let report = xpush(&mut db, chassis, &config)?;
    println!(
        "created {}, rewritten {}, removed {:?}",
        report.created, report.rewritten, report.removed
    );

    for (path, solid) in world_solids(&db, chassis, &config)? {
        let v = solid.vertex();
        println!(
            "{path:<24} {} at ({:.1}, {:.1}, {:.1})",
            solid.kind_name(),
            v.x,
            v.y,
            v.z
        );
    }

    db.save("wheel_bank.json")?;
    println!("wrote wheel_bank.json");
    Ok(())
}
