/// UPLINE RESOLUTION
///
/// Walks the sponsor chain above a member through a `MemberDirectory`.
/// The walk is bounded twice: by the generation depth (10 by default) and by
/// a visited set, so a cyclic sponsor graph in imported data stops at the
/// first repeated member instead of paying the same ancestor twice.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::member::{BusinessId, Member};
use crate::registry::MemberDirectory;

/// Number of paid network generations
pub const MAX_GENERATIONS: usize = 10;

/// Why an upline walk stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "member", rename_all = "snake_case")]
pub enum Termination {
    /// The last member found has no sponsor
    RootReached,
    /// A sponsor reference did not resolve to a member
    Unresolved(BusinessId),
    /// The depth bound was reached
    DepthExhausted,
    /// A sponsor reference pointed back into the chain already walked
    Cycle(BusinessId),
}

/// Resolved ancestors of a member, nearest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upline {
    /// Member the walk started from (not part of `ancestors`)
    pub origin: Option<BusinessId>,
    /// Ancestors; index 0 is generation 1
    pub ancestors: Vec<Member>,
    pub termination: Termination,
}

impl Upline {
    pub fn empty(termination: Termination) -> Self {
        Upline {
            origin: None,
            ancestors: Vec::new(),
            termination,
        }
    }

    /// Ancestor at a 1-based generation, `None` when no member sits there
    pub fn level(&self, generation: usize) -> Option<&Member> {
        generation
            .checked_sub(1)
            .and_then(|index| self.ancestors.get(index))
    }

    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ancestors.is_empty()
    }

    pub fn business_ids(&self) -> Vec<BusinessId> {
        self.ancestors.iter().map(|m| m.business_id.clone()).collect()
    }
}

/// Walk up from `start` collecting at most `max_depth` ancestors.
pub fn resolve_upline<D: MemberDirectory + ?Sized>(
    directory: &D,
    start: &Member,
    max_depth: usize,
) -> Upline {
    let mut visited: HashSet<BusinessId> = HashSet::from([start.business_id.clone()]);
    let mut ancestors: Vec<Member> = Vec::with_capacity(max_depth.min(MAX_GENERATIONS));
    let mut current = start;

    let termination = loop {
        let Some(sponsor_id) = current.sponsor_id.as_ref() else {
            break Termination::RootReached;
        };
        if ancestors.len() >= max_depth {
            break Termination::DepthExhausted;
        }
        if visited.contains(sponsor_id) {
            warn!(
                "Sponsor cycle detected above {} at {}",
                start.business_id, sponsor_id
            );
            break Termination::Cycle(sponsor_id.clone());
        }
        let Some(sponsor) = directory.find_by_business_id(sponsor_id) else {
            debug!("Sponsor {} of {} not found", sponsor_id, current.business_id);
            break Termination::Unresolved(sponsor_id.clone());
        };

        visited.insert(sponsor.business_id.clone());
        ancestors.push(sponsor.clone());
        current = sponsor;
    };

    Upline {
        origin: Some(start.business_id.clone()),
        ancestors,
        termination,
    }
}

/// Generation chain for a sale: the sponsor credited on the sale is
/// generation 1, its own sponsor generation 2, and so on.
pub fn sale_upline<D: MemberDirectory + ?Sized>(
    directory: &D,
    sponsor: Option<&BusinessId>,
    max_depth: usize,
) -> Upline {
    let Some(sponsor_id) = sponsor else {
        return Upline::empty(Termination::RootReached);
    };
    if max_depth == 0 {
        return Upline::empty(Termination::DepthExhausted);
    }
    let Some(first) = directory.find_by_business_id(sponsor_id) else {
        debug!("Sale sponsor {} not found", sponsor_id);
        return Upline::empty(Termination::Unresolved(sponsor_id.clone()));
    };

    let rest = resolve_upline(directory, first, max_depth - 1);
    let mut ancestors = Vec::with_capacity(rest.ancestors.len() + 1);
    ancestors.push(first.clone());
    ancestors.extend(rest.ancestors);

    Upline {
        origin: None,
        ancestors,
        termination: rest.termination,
    }
}

/// Directory-bound resolver with a fixed depth
pub struct UplineResolver<'a, D: MemberDirectory + ?Sized> {
    directory: &'a D,
    max_depth: usize,
}

impl<'a, D: MemberDirectory + ?Sized> UplineResolver<'a, D> {
    pub fn new(directory: &'a D) -> Self {
        Self::with_depth(directory, MAX_GENERATIONS)
    }

    pub fn with_depth(directory: &'a D, max_depth: usize) -> Self {
        UplineResolver { directory, max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn upline_of(&self, member: &Member) -> Upline {
        resolve_upline(self.directory, member, self.max_depth)
    }

    /// Upline of a member given by business identifier; `None` when the
    /// member itself is unknown
    pub fn upline_of_id(&self, id: &BusinessId) -> Option<Upline> {
        self.directory
            .find_by_business_id(id)
            .map(|member| self.upline_of(member))
    }

    pub fn sale_upline(&self, sponsor: Option<&BusinessId>) -> Upline {
        sale_upline(self.directory, sponsor, self.max_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::MemberRegistry;

    fn id(raw: &str) -> BusinessId {
        BusinessId::new(raw).unwrap()
    }

    /// Linear chain M0 <- M1 <- ... <- M{n-1}; M0 is the root
    fn chain(n: u64) -> MemberRegistry {
        MemberRegistry::from_members((0..n).map(|i| {
            let m = Member::new(i, id(&format!("M{i}")), format!("member {i}"));
            if i == 0 {
                m
            } else {
                m.with_sponsor(id(&format!("M{}", i - 1)))
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_root_has_empty_upline() {
        let registry = chain(3);
        let upline = UplineResolver::new(&registry).upline_of_id(&id("M0")).unwrap();
        assert!(upline.is_empty());
        assert_eq!(upline.termination, Termination::RootReached);
    }

    #[test]
    fn test_upline_order_is_nearest_first() {
        let registry = chain(4);
        let upline = UplineResolver::new(&registry).upline_of_id(&id("M3")).unwrap();
        assert_eq!(upline.business_ids(), vec![id("M2"), id("M1"), id("M0")]);
        assert_eq!(upline.level(1).unwrap().business_id, id("M2"));
        assert!(upline.level(0).is_none());
        assert!(upline.level(4).is_none());
        assert_eq!(upline.termination, Termination::RootReached);
    }

    #[test]
    fn test_depth_bound() {
        let registry = chain(15);
        let upline = UplineResolver::new(&registry).upline_of_id(&id("M14")).unwrap();
        assert_eq!(upline.depth(), MAX_GENERATIONS);
        assert_eq!(upline.level(10).unwrap().business_id, id("M4"));
        assert_eq!(upline.termination, Termination::DepthExhausted);
    }

    #[test]
    fn test_chain_of_exactly_max_depth_reaches_root() {
        // M10 has exactly ten ancestors
        let registry = chain(11);
        let upline = UplineResolver::new(&registry).upline_of_id(&id("M10")).unwrap();
        assert_eq!(upline.depth(), 10);
        assert_eq!(upline.termination, Termination::RootReached);
    }

    #[test]
    fn test_unresolved_sponsor_stops_early() {
        let registry = MemberRegistry::from_members(vec![
            Member::new(1, id("A"), "a").with_sponsor(id("MISSING")),
            Member::new(2, id("B"), "b").with_sponsor(id("A")),
        ])
        .unwrap();
        let upline = UplineResolver::new(&registry).upline_of_id(&id("B")).unwrap();
        assert_eq!(upline.business_ids(), vec![id("A")]);
        assert_eq!(upline.termination, Termination::Unresolved(id("MISSING")));
    }

    #[test]
    fn test_cycle_detected() {
        // Bulk load does not check cycles: A -> B -> C -> A
        let registry = MemberRegistry::from_members(vec![
            Member::new(1, id("A"), "a").with_sponsor(id("B")),
            Member::new(2, id("B"), "b").with_sponsor(id("C")),
            Member::new(3, id("C"), "c").with_sponsor(id("A")),
        ])
        .unwrap();
        let upline = UplineResolver::new(&registry).upline_of_id(&id("A")).unwrap();
        assert_eq!(upline.business_ids(), vec![id("B"), id("C")]);
        assert_eq!(upline.termination, Termination::Cycle(id("A")));
    }

    #[test]
    fn test_sale_upline_starts_at_sponsor() {
        let registry = chain(4);
        let upline = sale_upline(&registry, Some(&id("M3")), MAX_GENERATIONS);
        assert_eq!(
            upline.business_ids(),
            vec![id("M3"), id("M2"), id("M1"), id("M0")]
        );
        assert!(upline.origin.is_none());
    }

    #[test]
    fn test_sale_upline_bounded() {
        let registry = chain(20);
        let upline = sale_upline(&registry, Some(&id("M19")), MAX_GENERATIONS);
        assert_eq!(upline.depth(), 10);
        assert_eq!(upline.level(10).unwrap().business_id, id("M10"));
        assert_eq!(upline.termination, Termination::DepthExhausted);
    }

    #[test]
    fn test_sale_upline_unknown_or_missing_sponsor() {
        let registry = chain(2);
        let unknown = sale_upline(&registry, Some(&id("X")), MAX_GENERATIONS);
        assert!(unknown.is_empty());
        assert_eq!(unknown.termination, Termination::Unresolved(id("X")));

        let none = sale_upline(&registry, None, MAX_GENERATIONS);
        assert!(none.is_empty());
        assert_eq!(none.termination, Termination::RootReached);
    }

    #[test]
    fn test_sale_upline_self_loop_sponsor() {
        let registry = MemberRegistry::from_members(vec![
            Member::new(1, id("S"), "s").with_sponsor(id("S")),
        ])
        .unwrap();
        let upline = sale_upline(&registry, Some(&id("S")), MAX_GENERATIONS);
        assert_eq!(upline.business_ids(), vec![id("S")]);
        assert_eq!(upline.termination, Termination::Cycle(id("S")));
    }
}
