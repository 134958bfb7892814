/// HIERARCHY INTEGRATION TESTS
///
/// These tests verify:
/// - Upline walks terminate within the depth bound on any sponsor graph
/// - Sponsor reassignment is reflected in later walks
/// - Downline and upline queries agree with each other

use dipnet_core::*;
use proptest::prelude::*;

fn id(raw: &str) -> BusinessId {
    BusinessId::new(raw).unwrap()
}

#[test_log::test]
fn test_reassignment_changes_future_uplines() {
    let mut registry = MemberRegistry::from_members(vec![
        Member::new(1, id("R1"), "root one"),
        Member::new(2, id("R2"), "root two"),
        Member::new(3, id("MID"), "middle").with_sponsor(id("R1")),
        Member::new(4, id("LEAF"), "leaf").with_sponsor(id("MID")),
    ])
    .unwrap();

    let before = UplineResolver::new(&registry).upline_of_id(&id("LEAF")).unwrap();
    assert_eq!(before.business_ids(), vec![id("MID"), id("R1")]);

    registry.reassign_sponsor(&id("MID"), Some(id("R2"))).unwrap();

    let after = UplineResolver::new(&registry).upline_of_id(&id("LEAF")).unwrap();
    assert_eq!(after.business_ids(), vec![id("MID"), id("R2")]);
}

#[test]
fn test_downline_is_inverse_of_upline() {
    let mut members = vec![Member::new(0, id("TOP"), "top")];
    // Binary tree of depth 4 under TOP
    for i in 1..31u64 {
        let parent = if i <= 2 { "TOP".to_string() } else { format!("N{}", (i - 1) / 2) };
        members.push(Member::new(i, id(&format!("N{i}")), "").with_sponsor(id(&parent)));
    }
    let registry = MemberRegistry::from_members(members).unwrap();

    let downline = registry.downline(&id("TOP"), MAX_GENERATIONS).unwrap();
    assert_eq!(downline.len(), 30);

    let resolver = UplineResolver::new(&registry);
    for entry in &downline {
        let upline = resolver.upline_of_id(&entry.business_id).unwrap();
        assert_eq!(upline.depth(), entry.generation);
        assert_eq!(upline.level(entry.generation).unwrap().business_id, id("TOP"));
        assert_eq!(upline.level(1).unwrap().business_id, entry.sponsor_id);
    }
}

#[test]
fn test_directory_trait_object() {
    let registry = MemberRegistry::from_members(vec![
        Member::new(1, id("A"), "a"),
        Member::new(2, id("B"), "b").with_sponsor(id("A")),
    ])
    .unwrap();
    let directory: &dyn MemberDirectory = &registry;

    let upline = sale_upline(directory, Some(&id("B")), MAX_GENERATIONS);
    assert_eq!(upline.business_ids(), vec![id("B"), id("A")]);
}

proptest! {
    /// Arbitrary sponsor pointers (cycles, self loops, dangling references)
    /// never produce more than the bound or a repeated ancestor.
    #[test]
    fn prop_walk_is_bounded_and_acyclic(
        sponsors in prop::collection::vec(prop::option::of(0usize..40), 1..40),
        depth in 0usize..=MAX_GENERATIONS,
    ) {
        let members: Vec<Member> = sponsors
            .iter()
            .enumerate()
            .map(|(i, sponsor)| {
                let m = Member::new(i as u64, id(&format!("P{i}")), "");
                match sponsor {
                    Some(s) => m.with_sponsor(id(&format!("P{s}"))),
                    None => m,
                }
            })
            .collect();
        let registry = MemberRegistry::from_members(members.clone()).unwrap();

        for member in &members {
            let upline = resolve_upline(&registry, member, depth);
            prop_assert!(upline.depth() <= depth);

            let mut seen = std::collections::HashSet::new();
            seen.insert(member.business_id.clone());
            for ancestor in &upline.ancestors {
                prop_assert!(seen.insert(ancestor.business_id.clone()));
            }
        }
    }
}
