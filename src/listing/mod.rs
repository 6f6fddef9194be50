//! List/Reorder controller.
//!
//! Holds one displayed page of a resource listing and applies drag and
//! page moves optimistically. A rejected persist restores the exact page
//! that was shown before the move; an accepted one re-fetches the page.

mod reorder;

pub use reorder::{
    apply_sort, check_target_page, midpoint, plan_drag, plan_move_to_page, straddle, DragPlan,
    Edge, SINGLE_ITEM_GAP, SORT_GAP,
};

use crate::api::ApiClient;
use crate::errors::AppError;
use crate::models::{ListItem, ListingQuery, PaginatedListing};
use crate::notifications::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderPhase {
    Idle,
    ComputingTargetSort,
    Persisting,
    Reconciling,
}

/// Page size choice of the list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerPage {
    Count(u32),
    All,
}

impl PerPage {
    /// Choices offered by the list view.
    pub const CHOICES: [PerPage; 5] = [
        PerPage::Count(5),
        PerPage::Count(10),
        PerPage::Count(15),
        PerPage::Count(20),
        PerPage::All,
    ];

    fn query(self, page: u32) -> ListingQuery {
        match self {
            PerPage::Count(n) => ListingQuery::page(page, n),
            PerPage::All => ListingQuery {
                paginate: Some(false),
                ..Default::default()
            },
        }
    }
}

pub struct ListController {
    api: ApiClient,
    notifier: Notifier,
    route: String,
    listing: PaginatedListing<ListItem>,
    page: u32,
    per_page: PerPage,
    search: Option<String>,
    search_by: Option<String>,
    phase: ReorderPhase,
}

impl ListController {
    pub fn new(api: ApiClient, notifier: Notifier, route: &str, per_page: u32) -> Self {
        Self {
            api,
            notifier,
            route: route.trim_start_matches('/').to_string(),
            listing: PaginatedListing::empty(per_page),
            page: 1,
            per_page: PerPage::Count(per_page),
            search: None,
            search_by: None,
            phase: ReorderPhase::Idle,
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn listing(&self) -> &PaginatedListing<ListItem> {
        &self.listing
    }

    pub fn items(&self) -> &[ListItem] {
        self.listing.items()
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> PerPage {
        self.per_page
    }

    pub fn phase(&self) -> ReorderPhase {
        self.phase
    }

    fn query(&self, page: u32) -> ListingQuery {
        self.per_page
            .query(page)
            .with_search(self.search.clone(), self.search_by.clone())
    }

    async fn fetch(&self, page: u32) -> Result<PaginatedListing<ListItem>, AppError> {
        self.api.listing(&self.route, &self.query(page)).await
    }

    // ==================== PAGING ====================

    /// Load and display `page`.
    pub async fn load_page(&mut self, page: u32) -> Result<(), AppError> {
        match self.fetch(page).await {
            Ok(listing) => {
                tracing::debug!(
                    "Loaded {} page {}/{} ({} records)",
                    self.route,
                    listing.current_page,
                    listing.last_page,
                    listing.items().len()
                );
                self.page = listing.current_page.max(1);
                self.listing = listing;
                Ok(())
            }
            Err(err) => {
                self.notifier.failure(&err);
                Err(err)
            }
        }
    }

    pub async fn set_page(&mut self, page: u32) -> Result<(), AppError> {
        self.load_page(page.max(1)).await
    }

    /// Re-fetch the displayed page, e.g. after a create.
    pub async fn refresh(&mut self) -> Result<(), AppError> {
        self.load_page(self.page).await
    }

    pub async fn set_per_page(&mut self, per_page: PerPage) -> Result<(), AppError> {
        self.per_page = per_page;
        self.load_page(1).await
    }

    /// Filter by `query` on `search_by`; an empty query clears the filter.
    pub async fn set_search(
        &mut self,
        query: Option<String>,
        search_by: Option<String>,
    ) -> Result<(), AppError> {
        self.search = query.filter(|q| !q.is_empty());
        self.search_by = search_by;
        self.load_page(1).await
    }

    /// Delete a record and refresh; an emptied page steps back one page.
    pub async fn delete_item(&mut self, id: &str) -> Result<(), AppError> {
        if let Err(err) = self.api.delete(&self.route, id).await {
            self.notifier.failure(&err);
            return Err(err);
        }
        tracing::info!("Deleted {} from {}", id, self.route);
        self.notifier.success("Record deleted");

        self.refresh().await?;
        if self.items().is_empty() && self.page > 1 {
            self.load_page(self.page - 1).await?;
        }
        Ok(())
    }

    /// Forget everything displayed.
    pub fn clean(&mut self) {
        let per_page = match self.per_page {
            PerPage::Count(n) => n,
            PerPage::All => 0,
        };
        self.listing = PaginatedListing::empty(per_page);
        self.page = 1;
        self.search = None;
        self.search_by = None;
        self.phase = ReorderPhase::Idle;
    }

    // ==================== REORDER ====================

    fn sorts(items: &[ListItem]) -> Vec<i64> {
        items.iter().map(|item| item.sort).collect()
    }

    /// Drag the record at `source` to `destination` on the displayed page.
    pub async fn reorder(&mut self, source: usize, destination: usize) -> Result<(), AppError> {
        if self.phase != ReorderPhase::Idle {
            return Err(AppError::Validation("A reorder is already pending".to_string()));
        }
        self.phase = ReorderPhase::ComputingTargetSort;

        let items = self.items();
        let sorts = Self::sorts(items);
        let plan = match plan_drag(
            &sorts,
            source,
            destination,
            self.listing.current_page,
            self.listing.last_page,
        ) {
            Ok(plan) => plan,
            Err(err) => {
                self.phase = ReorderPhase::Idle;
                return Err(err);
            }
        };

        let sort = match plan {
            DragPlan::NoOp => {
                self.phase = ReorderPhase::Idle;
                return Ok(());
            }
            DragPlan::Sort(sort) => sort,
            DragPlan::Straddle { page, edge } => match self.fetch(page).await {
                Ok(adjacent) => straddle(edge, sorts[destination], &Self::sorts(adjacent.items())),
                Err(err) => {
                    tracing::warn!("Could not fetch page {} of {}: {}", page, self.route, err);
                    self.phase = ReorderPhase::Idle;
                    self.notifier.failure(&err);
                    return Err(err);
                }
            },
        };

        tracing::debug!(
            "Reorder {} {} -> {}: new sort {}",
            self.route,
            source,
            destination,
            sort
        );
        self.persist(source, sort, false).await
    }

    /// Move the record at `index` onto page `target`.
    pub async fn move_to_page(&mut self, index: usize, target: u32) -> Result<(), AppError> {
        if self.phase != ReorderPhase::Idle {
            return Err(AppError::Validation("A reorder is already pending".to_string()));
        }
        check_target_page(target, self.listing.current_page, self.listing.last_page)?;
        if index >= self.items().len() {
            return Err(AppError::Validation(format!("No record at position {}", index)));
        }

        self.phase = ReorderPhase::ComputingTargetSort;
        let sort = match self.fetch(target).await {
            Ok(page) => plan_move_to_page(&Self::sorts(page.items())),
            Err(err) => Err(err),
        };
        let sort = match sort {
            Ok(sort) => sort,
            Err(err) => {
                self.phase = ReorderPhase::Idle;
                self.notifier.failure(&err);
                return Err(err);
            }
        };

        tracing::debug!("Move {} #{} to page {}: new sort {}", self.route, index, target, sort);
        self.persist(index, sort, true).await
    }

    /// Apply a new sort optimistically, persist it, then reconcile.
    async fn persist(&mut self, index: usize, sort: i64, leaves_page: bool) -> Result<(), AppError> {
        let snapshot = self.listing.clone();
        let Some(mut item) = self.items().get(index).cloned() else {
            self.phase = ReorderPhase::Idle;
            return Err(AppError::Validation(format!("No record at position {}", index)));
        };
        item.sort = sort;

        if let Some(data) = self.listing.data.as_mut() {
            if leaves_page {
                data.remove(index);
            } else {
                apply_sort(data, index, sort);
            }
        }

        self.phase = ReorderPhase::Persisting;
        if let Err(err) = self.api.update(&self.route, &item.id, &item.to_record()).await {
            tracing::warn!("Reorder of {} rejected, restoring page: {}", item.id, err);
            self.listing = snapshot;
            self.phase = ReorderPhase::Idle;
            self.notifier.failure(&err);
            return Err(err);
        }

        self.phase = ReorderPhase::Reconciling;
        match self.fetch(self.page).await {
            Ok(listing) => self.listing = listing,
            Err(err) => tracing::warn!("Reconcile of {} failed, keeping local order: {}", self.route, err),
        }
        self.phase = ReorderPhase::Idle;
        Ok(())
    }
}
