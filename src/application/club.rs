//! Service graph assembly.
//!
//! `ClubServices` wires the five services onto one set of repositories so
//! the binary and the integration tests build the same graph.

use std::sync::Arc;

use crate::ports::{
    CycleRepository, InvitationRepository, MemberDuesRepository, MemberRepository,
    PaymentRepository,
};

use super::services::{
    AccessGate, CycleDefaults, DuesCycleManager, DuesLedger, InvitationService, MemberRegistry,
};

/// One implementation per store port.
#[derive(Clone)]
pub struct Repositories {
    pub invitations: Arc<dyn InvitationRepository>,
    pub members: Arc<dyn MemberRepository>,
    pub cycles: Arc<dyn CycleRepository>,
    pub dues: Arc<dyn MemberDuesRepository>,
    pub payments: Arc<dyn PaymentRepository>,
}

impl Repositories {
    /// Uses a single store for every port.
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: InvitationRepository
            + MemberRepository
            + CycleRepository
            + MemberDuesRepository
            + PaymentRepository
            + 'static,
    {
        Self {
            invitations: store.clone(),
            members: store.clone(),
            cycles: store.clone(),
            dues: store.clone(),
            payments: store,
        }
    }
}

#[derive(Clone)]
pub struct ClubServices {
    pub invitations: Arc<InvitationService>,
    pub members: Arc<MemberRegistry>,
    pub cycles: Arc<DuesCycleManager>,
    pub ledger: Arc<DuesLedger>,
    pub access: Arc<AccessGate>,
}

impl ClubServices {
    pub fn new(repos: Repositories, invitation_validity_days: i64, cycle_defaults: CycleDefaults) -> Self {
        let members = Arc::new(MemberRegistry::new(repos.members));
        let cycles = Arc::new(DuesCycleManager::new(repos.cycles, cycle_defaults));
        let ledger = Arc::new(DuesLedger::new(
            repos.dues,
            repos.payments,
            members.clone(),
            cycles.clone(),
        ));
        let invitations = Arc::new(InvitationService::new(
            repos.invitations,
            members.clone(),
            invitation_validity_days,
        ));
        let access = Arc::new(AccessGate::new(members.clone()));
        Self {
            invitations,
            members,
            cycles,
            ledger,
            access,
        }
    }
}
