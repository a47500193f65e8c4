//! Recursive expansion of one root into a tree of sub-objects and page paths

use crate::error::Result;
use crate::paths::PathResolver;
use crate::resolver::{HAS_ITEM, HAS_PAGE, HAS_VOLUME, ModelResolver};
use crate::tree::{PageCounter, TreeNode};
use crate::types::{Bounds, Identifier, ObjectModel, RangeFilter};
use futures::FutureExt;
use futures::future::BoxFuture;
use regex::Regex;
use std::fmt::Debug;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Metadata element holding a volume's publication date
const DATE_ELEMENT: &str = "date";
/// Metadata element holding an issue designation
const NUMBER_ELEMENT: &str = "number";

static YEAR: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\d{4}").ok());

/// Crawls repository hierarchies on behalf of one job
///
/// Every worker of a job shares the same [`PageCounter`]; once it passes the
/// ceiling no further subtree is expanded, but pages already resolved are kept.
/// Expansion and the job's final check compare the same way, so a crawl that
/// stops early always leaves a count above the ceiling behind.
pub struct Crawler {
    resolver: ModelResolver,
    paths: PathResolver,
    ranges: RangeFilter,
    counter: PageCounter,
    ceiling: usize,
}

impl Crawler {
    /// Crawler applying `ranges`, counting into `counter`
    pub fn new(
        resolver: ModelResolver,
        paths: PathResolver,
        ranges: RangeFilter,
        counter: PageCounter,
        ceiling: usize,
    ) -> Self {
        Self {
            resolver,
            paths,
            ranges,
            counter,
            ceiling,
        }
    }

    /// Pages counted so far by every crawler sharing this counter
    pub fn counter(&self) -> &PageCounter {
        &self.counter
    }

    /// Expand `node` in place.
    ///
    /// Unknown models yield nothing and are not an error. Repository and model
    /// resolution failures abort the subtree and propagate.
    pub fn crawl<'a>(&'a self, node: &'a mut TreeNode) -> BoxFuture<'a, Result<()>> {
        async move {
            if self.counter.get() > self.ceiling {
                debug!(identifier = %node.name(), pages = self.counter.get(), "page ceiling passed, not expanding");
                return Ok(());
            }

            let rels = self.resolver.relationships(node.name()).await?;
            let model = ModelResolver::model_of(node.name(), &rels)?;

            match model {
                ObjectModel::Page => {
                    let page = node.name().to_string();
                    self.add_pages(node, std::slice::from_ref(&page)).await
                }
                ObjectModel::FlatContainer => {
                    let pages = rels.children(HAS_PAGE);
                    let window = self.ranges.pages.slice(&pages);
                    debug!(identifier = %node.name(), total = pages.len(), selected = window.len(), "resolving pages");
                    self.add_pages(node, window).await
                }
                ObjectModel::PeriodicalRoot => {
                    let volumes = rels.children(HAS_VOLUME);
                    self.crawl_window(node, &volumes, DATE_ELEMENT, &self.ranges.years, parse_year)
                        .await
                }
                ObjectModel::PeriodicalVolume => {
                    let issues = rels.children(HAS_ITEM);
                    self.crawl_window(node, &issues, NUMBER_ELEMENT, &self.ranges.issues, parse_issue)
                        .await
                }
                ObjectModel::Unknown => {
                    warn!(identifier = %node.name(), models = ?rels.models(), "unsupported model, subtree skipped");
                    Ok(())
                }
            }
        }
        .boxed()
    }

    async fn add_pages(&self, node: &mut TreeNode, pages: &[String]) -> Result<()> {
        for page in pages {
            let Some(path) = self.paths.resolve_page_image_path(&self.resolver, page).await? else {
                continue;
            };
            if node.add_page_path(path) && self.counter.increment() > self.ceiling {
                debug!(identifier = %node.name(), ceiling = self.ceiling, "page ceiling passed");
                break;
            }
        }
        Ok(())
    }

    /// Recurse into `children`, restricted to the closed window `bounds`.
    ///
    /// Children are skipped until one whose key equals the lower bound; the
    /// child whose key equals the upper bound is the last one visited. Keys are
    /// read from descriptive metadata only while a bound still needs checking.
    async fn crawl_window<K: PartialEq + Debug>(
        &self,
        node: &mut TreeNode,
        children: &[String],
        element: &str,
        bounds: &Bounds<K>,
        key: fn(&str) -> Option<K>,
    ) -> Result<()> {
        let mut started = bounds.from.is_none();

        for child in children {
            let Ok(id) = Identifier::parse(child.as_str()) else {
                warn!(parent = %node.name(), child = %child, "child without identifier prefix skipped");
                continue;
            };

            let mut last = false;
            if bounds.is_bounded() && (!started || bounds.to.is_some()) {
                let value = self
                    .resolver
                    .metadata_value(&id, element)
                    .await?
                    .and_then(|v| key(&v));

                if !started {
                    started = value.is_some() && value.as_ref() == bounds.from.as_ref();
                    if !started {
                        debug!(identifier = %id, ?value, "before range, skipped");
                        continue;
                    }
                }
                last = value.is_some() && value.as_ref() == bounds.to.as_ref();
            }

            match node.create_child(id) {
                Some(child) => self.crawl(child).await?,
                None => debug!(parent = %node.name(), child = %child, "duplicate child skipped"),
            }

            if last {
                break;
            }
        }

        Ok(())
    }
}

fn parse_year(value: &str) -> Option<i32> {
    YEAR.as_ref()?.find(value)?.as_str().parse().ok()
}

fn parse_issue(value: &str) -> Option<String> {
    Some(value.trim().to_string()).filter(|v| !v.is_empty())
}
