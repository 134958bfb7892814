/// MEMBER REGISTRY
///
/// In-memory sponsor hierarchy. Members are indexed by business identifier
/// (O(1) sponsor lookup) and by internal id, and an adjacency index maps each
/// sponsor to its direct recruits so downline queries never scan the table.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use thiserror::Error;

use crate::member::{BusinessId, Member};

/// Member lookup capability used by the upline resolver and the calculator
pub trait MemberDirectory {
    fn find_by_business_id(&self, id: &BusinessId) -> Option<&Member>;

    fn find_by_internal_id(&self, internal_id: u64) -> Option<&Member>;
}

/// A member found below another member, with its depth relative to the root
/// of the query (1 = direct recruit)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownlineEntry {
    pub generation: usize,
    pub business_id: BusinessId,
    pub sponsor_id: BusinessId,
}

#[derive(Debug, Clone, Default)]
pub struct MemberRegistry {
    /// Members keyed by business identifier
    members: HashMap<BusinessId, Member>,
    /// Internal id -> business identifier
    by_internal_id: HashMap<u64, BusinessId>,
    /// Sponsor -> direct recruits (sorted for deterministic output)
    recruits: HashMap<BusinessId, BTreeSet<BusinessId>>,
}

impl MemberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk load. Duplicates are rejected; sponsor cycles in imported data are
    /// left to the bounded resolver.
    pub fn from_members<I>(members: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = Member>,
    {
        let mut registry = MemberRegistry::new();
        for member in members {
            registry.insert(member)?;
        }

        let dangling = registry.dangling_sponsors().len();
        if dangling > 0 {
            warn!("Loaded {} members, {} with unresolved sponsor", registry.len(), dangling);
        } else {
            info!("Loaded {} members", registry.len());
        }
        Ok(registry)
    }

    /// Register a single member. An unknown sponsor is accepted (the sponsor
    /// may be registered later) but a sponsor chain leading back to the new
    /// member is rejected.
    pub fn register(&mut self, member: Member) -> Result<(), RegistryError> {
        if let Some(sponsor) = &member.sponsor_id {
            if sponsor == &member.business_id || self.chain_contains(sponsor, &member.business_id) {
                return Err(RegistryError::SponsorCycle {
                    member: member.business_id.clone(),
                    sponsor: sponsor.clone(),
                });
            }
            if !self.members.contains_key(sponsor) {
                warn!(
                    "Member {} registered with unknown sponsor {}",
                    member.business_id, sponsor
                );
            }
        }
        self.insert(member)
    }

    fn insert(&mut self, member: Member) -> Result<(), RegistryError> {
        if self.members.contains_key(&member.business_id) {
            return Err(RegistryError::DuplicateBusinessId(member.business_id));
        }
        if self.by_internal_id.contains_key(&member.internal_id) {
            return Err(RegistryError::DuplicateInternalId(member.internal_id));
        }

        if let Some(sponsor) = &member.sponsor_id {
            self.recruits
                .entry(sponsor.clone())
                .or_default()
                .insert(member.business_id.clone());
        }
        self.by_internal_id
            .insert(member.internal_id, member.business_id.clone());
        debug!("Registered member {}", member.business_id);
        self.members.insert(member.business_id.clone(), member);
        Ok(())
    }

    /// Move a member under a new sponsor (or make it a root with `None`).
    /// Returns the previous sponsor.
    pub fn reassign_sponsor(
        &mut self,
        member_id: &BusinessId,
        new_sponsor: Option<BusinessId>,
    ) -> Result<Option<BusinessId>, RegistryError> {
        if !self.members.contains_key(member_id) {
            return Err(RegistryError::MemberNotFound(member_id.clone()));
        }

        if let Some(sponsor) = &new_sponsor {
            if !self.members.contains_key(sponsor) {
                return Err(RegistryError::SponsorNotFound(sponsor.clone()));
            }
            // The new sponsor must not sit in the member's own downline
            if self.chain_contains(sponsor, member_id) {
                return Err(RegistryError::SponsorCycle {
                    member: member_id.clone(),
                    sponsor: sponsor.clone(),
                });
            }
        }

        let member = self
            .members
            .get_mut(member_id)
            .ok_or_else(|| RegistryError::MemberNotFound(member_id.clone()))?;
        let previous = std::mem::replace(&mut member.sponsor_id, new_sponsor.clone());

        if let Some(old) = &previous {
            if let Some(set) = self.recruits.get_mut(old) {
                set.remove(member_id);
                if set.is_empty() {
                    self.recruits.remove(old);
                }
            }
        }
        if let Some(sponsor) = new_sponsor {
            info!("Member {} reassigned to sponsor {}", member_id, sponsor);
            self.recruits.entry(sponsor).or_default().insert(member_id.clone());
        } else {
            info!("Member {} detached from sponsor", member_id);
        }

        Ok(previous)
    }

    /// Walk the sponsor chain from `start` (inclusive) looking for `target`.
    /// Guarded by a visited set so cyclic imported data terminates.
    fn chain_contains(&self, start: &BusinessId, target: &BusinessId) -> bool {
        let mut visited = HashSet::new();
        let mut current = Some(start);

        while let Some(id) = current {
            if id == target {
                return true;
            }
            if !visited.insert(id) {
                return false;
            }
            current = self
                .members
                .get(id)
                .and_then(|m| m.sponsor_id.as_ref());
        }
        false
    }

    pub fn get(&self, id: &BusinessId) -> Option<&Member> {
        self.members.get(id)
    }

    pub fn contains(&self, id: &BusinessId) -> bool {
        self.members.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    /// Direct recruits of a member, ordered by business identifier
    pub fn direct_recruits(&self, id: &BusinessId) -> Vec<&Member> {
        self.recruits
            .get(id)
            .map(|set| set.iter().filter_map(|r| self.members.get(r)).collect())
            .unwrap_or_default()
    }

    /// Breadth-first downline of a member, at most `max_depth` generations deep
    pub fn downline(
        &self,
        id: &BusinessId,
        max_depth: usize,
    ) -> Result<Vec<DownlineEntry>, RegistryError> {
        if !self.members.contains_key(id) {
            return Err(RegistryError::MemberNotFound(id.clone()));
        }

        let mut entries = Vec::new();
        let mut visited: HashSet<&BusinessId> = HashSet::from([id]);
        let mut queue: VecDeque<(&BusinessId, usize)> = VecDeque::from([(id, 0)]);

        while let Some((sponsor, generation)) = queue.pop_front() {
            if generation >= max_depth {
                continue;
            }
            let Some(children) = self.recruits.get(sponsor) else {
                continue;
            };
            for child in children {
                if !self.members.contains_key(child) || !visited.insert(child) {
                    continue;
                }
                entries.push(DownlineEntry {
                    generation: generation + 1,
                    business_id: child.clone(),
                    sponsor_id: sponsor.clone(),
                });
                queue.push_back((child, generation + 1));
            }
        }

        Ok(entries)
    }

    /// Members whose sponsor reference does not resolve
    pub fn dangling_sponsors(&self) -> Vec<&Member> {
        let mut dangling: Vec<&Member> = self
            .members
            .values()
            .filter(|m| {
                m.sponsor_id
                    .as_ref()
                    .map_or(false, |s| !self.members.contains_key(s))
            })
            .collect();
        dangling.sort_by(|a, b| a.business_id.cmp(&b.business_id));
        dangling
    }
}

impl MemberDirectory for MemberRegistry {
    fn find_by_business_id(&self, id: &BusinessId) -> Option<&Member> {
        self.members.get(id)
    }

    fn find_by_internal_id(&self, internal_id: u64) -> Option<&Member> {
        self.by_internal_id
            .get(&internal_id)
            .and_then(|id| self.members.get(id))
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Business identifier already registered: {0}")]
    DuplicateBusinessId(BusinessId),
    #[error("Internal id already registered: {0}")]
    DuplicateInternalId(u64),
    #[error("Member not found: {0}")]
    MemberNotFound(BusinessId),
    #[error("Sponsor not found: {0}")]
    SponsorNotFound(BusinessId),
    #[error("Sponsoring {member} under {sponsor} would create a cycle")]
    SponsorCycle { member: BusinessId, sponsor: BusinessId },
}
