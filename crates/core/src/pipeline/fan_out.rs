//! # Research Fan-Out
//!
//! Spawns one task per research branch into a `JoinSet` and hands results
//! back in completion order. Dropping a [`FanOut`] aborts every branch still
//! in flight.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use crate::error::BranchFailure;
use crate::skills::{ResearcherSkill, SkillContext};
use crate::state::{ResearchBranch, ResearchFinding, RunRequest};

pub type BranchOutcome = Result<ResearchFinding, BranchFailure>;

pub struct FanOut {
    join_set: JoinSet<BranchOutcome>,
    total: usize,
}

impl FanOut {
    /// Start every branch at once. With a `limit`, at most that many
    /// branches call the generator concurrently.
    pub fn spawn(
        branches: Vec<ResearchBranch>,
        request: Arc<RunRequest>,
        ctx: &SkillContext,
        limit: Option<usize>,
    ) -> Self {
        let semaphore = limit.filter(|n| *n > 0).map(|n| Arc::new(Semaphore::new(n)));
        let total = branches.len();
        let mut join_set = JoinSet::new();

        // SCATTER: one task per branch
        for branch in branches {
            let request = Arc::clone(&request);
            let ctx = ctx.clone();
            let semaphore = semaphore.clone();

            join_set.spawn(async move {
                // Hold the permit until the branch finishes
                let _permit = match semaphore {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };

                ResearcherSkill::run(&branch, &request, &ctx)
                    .await
                    .map_err(|source| BranchFailure {
                        branch_index: branch.branch_index,
                        topic: branch.topic.clone(),
                        source,
                    })
            });
        }

        Self { join_set, total }
    }

    /// Number of branches spawned
    pub fn total(&self) -> usize {
        self.total
    }

    /// Next finished branch, in completion order. `None` once all are done.
    pub async fn next(&mut self) -> Option<Result<BranchOutcome, JoinError>> {
        self.join_set.join_next().await
    }
}
