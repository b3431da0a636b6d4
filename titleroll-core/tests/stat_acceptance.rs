use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::collections::HashMap;
use std::convert::TryFrom;
use titleroll_core::{BoostPruning, CatalogEntry, EntryId, select, weigh};

const SAMPLE_SIZE: usize = 40_000;
const TOLERANCE: f64 = 0.01;

fn catalog(ratios: &[f64]) -> Vec<CatalogEntry> {
    ratios
        .iter()
        .zip(1_u64..)
        .map(|(ratio, id)| CatalogEntry::new(id, format!("Title {id}"), *ratio))
        .collect()
}

fn tally(entries: &[CatalogEntry], boost: f64, pruning: BoostPruning, seed: u64) -> HashMap<EntryId, usize> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut counts = HashMap::new();
    for _ in 0..SAMPLE_SIZE {
        let chosen = select(entries, boost, pruning, &mut rng).expect("eligible catalog");
        *counts.entry(chosen.id).or_insert(0) += 1;
    }
    counts
}

fn share(counts: &HashMap<EntryId, usize>, id: u64) -> f64 {
    let count = counts.get(&EntryId(id)).copied().unwrap_or(0);
    f64::from(u32::try_from(count).expect("count fits"))
        / f64::from(u32::try_from(SAMPLE_SIZE).expect("sample size fits"))
}

#[test]
fn unboosted_shares_track_inverse_ratios() {
    let ratios = [2.0, 5.0, 20.0, 100.0];
    let entries = catalog(&ratios);
    let counts = tally(&entries, 1.0, BoostPruning::Inclusive, 0xACED);

    let inverse_total: f64 = ratios.iter().map(|r| 1.0 / r).sum();
    for (ratio, id) in ratios.iter().zip(1_u64..) {
        let expected = (1.0 / ratio) / inverse_total;
        let observed = share(&counts, id);
        assert!(
            (observed - expected).abs() <= TOLERANCE,
            "entry {id}: observed {observed:.4} expected {expected:.4}"
        );
    }
}

#[test]
fn common_title_wins_about_fifty_times_as_often() {
    let entries = catalog(&[2.0, 100.0]);
    let counts = tally(&entries, 1.0, BoostPruning::Inclusive, 1234);
    let common = counts.get(&EntryId(1)).copied().unwrap_or(0);
    let rare = counts.get(&EntryId(2)).copied().unwrap_or(0);
    assert!(rare > 0, "rare title never drawn");
    let ratio = f64::from(u32::try_from(common).expect("fits"))
        / f64::from(u32::try_from(rare).expect("fits"));
    assert!(
        (42.0..=60.0).contains(&ratio),
        "common/rare ratio drifted: {ratio:.2}"
    );
}

#[test]
fn boosted_shares_match_weight_table() {
    let entries = catalog(&[2.0, 10.0, 50.0, 300.0]);
    let table = weigh(&entries, 10.0, BoostPruning::Disabled).expect("eligible");
    let counts = tally(&entries, 10.0, BoostPruning::Disabled, 77);

    for id in 1..=4 {
        let expected = table.probability(EntryId(id)).expect("eligible entry");
        let observed = share(&counts, id);
        assert!(
            (observed - expected).abs() <= TOLERANCE,
            "entry {id}: observed {observed:.4} expected {expected:.4}"
        );
    }
}

#[test]
fn boost_moves_mass_toward_rare_titles() {
    let entries = catalog(&[10.0, 100.0, 1_000.0]);
    let plain = tally(&entries, 1.0, BoostPruning::Inclusive, 9);
    let boosted = tally(&entries, 10.0, BoostPruning::Inclusive, 9);

    assert!(share(&boosted, 3) > share(&plain, 3));
    assert!(share(&boosted, 2) > share(&plain, 2));
    assert!(share(&boosted, 1) < share(&plain, 1));
}

#[test]
fn pruned_titles_are_never_drawn() {
    let entries = catalog(&[2.0, 5.0, 50.0, 300.0]);
    let counts = tally(&entries, 50.0, BoostPruning::Inclusive, 31);
    assert!(!counts.contains_key(&EntryId(1)));
    assert!(!counts.contains_key(&EntryId(2)));
    assert_eq!(counts.values().sum::<usize>(), SAMPLE_SIZE);
}
