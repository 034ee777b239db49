//! Target acquisition.

use crate::components::UnitId;
use crate::math::Vec3Fixed;
use crate::roster::Roster;
use crate::storage::Storage;
use crate::unit::Unit;

/// Find the nearest living member of `enemies`.
///
/// Ids that no longer resolve and dead units are skipped. Ties keep the
/// candidate that comes first in roster order. Returns `None` when no
/// living enemy remains.
#[must_use]
pub fn find_nearest_living(
    origin: Vec3Fixed,
    enemies: &Roster,
    units: &Storage<Unit>,
) -> Option<UnitId> {
    let mut nearest = None;
    let mut nearest_dist_sq = None;

    for &id in enemies.members() {
        let Some(candidate) = units.get(id) else {
            continue;
        };
        if candidate.is_dead() {
            continue;
        }

        let dist_sq = origin.distance_squared(candidate.position);
        if nearest_dist_sq.map_or(true, |best| dist_sq < best) {
            nearest_dist_sq = Some(dist_sq);
            nearest = Some(id);
        }
    }

    nearest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Team;
    use crate::data::UnitStats;
    use crate::math::Fixed;

    fn spawn(units: &mut Storage<Unit>, roster: &mut Roster, x: i32) -> UnitId {
        let position = Vec3Fixed::new(Fixed::from_num(x), Fixed::ZERO, Fixed::ZERO);
        let id = units.insert_with(|id| Unit::new(id, UnitStats::melee(Team::B), position));
        roster.add(id);
        id
    }

    #[test]
    fn test_picks_nearest() {
        let mut units = Storage::new();
        let mut roster = Roster::new();
        spawn(&mut units, &mut roster, 5);
        let near = spawn(&mut units, &mut roster, 2);
        spawn(&mut units, &mut roster, 8);

        assert_eq!(find_nearest_living(Vec3Fixed::ZERO, &roster, &units), Some(near));
    }

    #[test]
    fn test_empty_roster() {
        let units = Storage::new();
        assert_eq!(find_nearest_living(Vec3Fixed::ZERO, &Roster::new(), &units), None);
    }

    #[test]
    fn test_skips_dead_and_missing() {
        let mut units = Storage::new();
        let mut roster = Roster::new();
        let dead = spawn(&mut units, &mut roster, 1);
        let gone = spawn(&mut units, &mut roster, 2);
        let alive = spawn(&mut units, &mut roster, 9);

        if let Some(unit) = units.get_mut(dead) {
            unit.take_damage(u32::MAX);
        }
        units.remove(gone);

        assert_eq!(find_nearest_living(Vec3Fixed::ZERO, &roster, &units), Some(alive));

        units.remove(alive);
        assert_eq!(find_nearest_living(Vec3Fixed::ZERO, &roster, &units), None);
    }

    #[test]
    fn test_tie_keeps_roster_order() {
        let mut units = Storage::new();
        let mut roster = Roster::new();
        let first = spawn(&mut units, &mut roster, 3);
        spawn(&mut units, &mut roster, -3);

        assert_eq!(find_nearest_living(Vec3Fixed::ZERO, &roster, &units), Some(first));
    }
}
