//! Weighted distribution of virtual users across scenarios.
//!
//! Implements the "external helper" spec.md §4.6 step 5 calls out: splitting
//! a fixed pool of user ids across scenarios in proportion to each
//! scenario's declared `weight`. Grounded in the teacher's
//! `ScenarioSelector`'s cumulative-weight binary search, generalized here to
//! partition a list up front rather than draw one random sample per call.

use crate::scenario::Scenario;

/// Split `user_ids` across `scenarios` in proportion to each scenario's
/// `weight`, returning one user-id list per scenario in input order.
///
/// Users are assigned contiguously (scenario 0 gets the first N0, scenario 1
/// the next N1, ...) via each scenario's cumulative share of the total
/// weight, so the split is deterministic for a given input rather than
/// randomized per user.
pub fn distribute_users(scenarios: &[Scenario], user_ids: &[u64]) -> Vec<Vec<u64>> {
    if scenarios.is_empty() || user_ids.is_empty() {
        return scenarios.iter().map(|_| Vec::new()).collect();
    }

    let total_weight: f64 = scenarios.iter().map(|s| s.weight.max(0.0)).sum();
    if total_weight <= 0.0 {
        // No usable weights: split as evenly as possible.
        return even_split(scenarios.len(), user_ids);
    }

    let mut cumulative_weights = Vec::with_capacity(scenarios.len());
    let mut running = 0.0;
    for scenario in scenarios {
        running += scenario.weight.max(0.0);
        cumulative_weights.push(running);
    }

    let total_users = user_ids.len();
    let mut boundaries = Vec::with_capacity(scenarios.len());
    for cumulative in &cumulative_weights {
        let share = (cumulative / total_weight * total_users as f64).round() as usize;
        boundaries.push(share.min(total_users));
    }
    *boundaries.last_mut().unwrap() = total_users;

    let mut out = Vec::with_capacity(scenarios.len());
    let mut start = 0;
    for boundary in boundaries {
        let end = boundary.max(start);
        out.push(user_ids[start..end].to_vec());
        start = end;
    }
    out
}

fn even_split(n: usize, user_ids: &[u64]) -> Vec<Vec<u64>> {
    let mut out: Vec<Vec<u64>> = vec![Vec::new(); n];
    for (i, id) in user_ids.iter().enumerate() {
        out[i % n].push(*id);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;

    fn scenario(name: &str, weight: f64) -> Scenario {
        Scenario::new(name, vec![]).with_weight(weight)
    }

    #[test]
    fn splits_proportionally_to_weight() {
        let scenarios = vec![scenario("read", 80.0), scenario("write", 20.0)];
        let user_ids: Vec<u64> = (0..100).collect();

        let split = distribute_users(&scenarios, &user_ids);

        assert_eq!(split[0].len(), 80);
        assert_eq!(split[1].len(), 20);
        assert_eq!(split[0][0], 0);
        assert_eq!(split[1][0], 80);
    }

    #[test]
    fn covers_every_user_exactly_once() {
        let scenarios = vec![scenario("a", 1.0), scenario("b", 2.0), scenario("c", 3.0)];
        let user_ids: Vec<u64> = (0..37).collect();

        let split = distribute_users(&scenarios, &user_ids);
        let total: usize = split.iter().map(|s| s.len()).sum();
        assert_eq!(total, 37);

        let mut seen: Vec<u64> = split.into_iter().flatten().collect();
        seen.sort_unstable();
        assert_eq!(seen, user_ids);
    }

    #[test]
    fn single_scenario_gets_all_users() {
        let scenarios = vec![scenario("only", 1.0)];
        let user_ids: Vec<u64> = (0..5).collect();

        let split = distribute_users(&scenarios, &user_ids);
        assert_eq!(split[0], user_ids);
    }

    #[test]
    fn zero_total_weight_falls_back_to_even_split() {
        let scenarios = vec![scenario("a", 0.0), scenario("b", 0.0)];
        let user_ids: Vec<u64> = (0..4).collect();

        let split = distribute_users(&scenarios, &user_ids);
        assert_eq!(split[0].len() + split[1].len(), 4);
    }

    #[test]
    fn empty_user_ids_yields_empty_lists() {
        let scenarios = vec![scenario("a", 1.0), scenario("b", 1.0)];
        let split = distribute_users(&scenarios, &[]);
        assert_eq!(split, vec![Vec::<u64>::new(), Vec::new()]);
    }
}
