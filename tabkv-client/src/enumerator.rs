/// Resumable table enumeration
///
/// A scan walks the table one page at a time using the continuation token
/// returned with each page. Pages may come back empty while the token is
/// not yet `END`: that only means the tablet just visited held no records,
/// so fetching continues until records arrive or the scan completes.
///
/// Enumeration is best effort: objects written or removed during a scan may
/// be seen zero, one or two times.

use std::sync::Arc;
use tabkv_core::wire::decode_page;
use tabkv_core::{Cluster, ContinuationToken, Error, Object, Result, TableId};
use tracing::{debug, warn};

/// One decoded page and the token that continues the scan after it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePage {
    pub objects: Vec<Object>,
    pub next_token: ContinuationToken,
}

impl TablePage {
    /// True once the scan has nothing more to return.
    pub fn is_last(&self) -> bool {
        self.next_token.is_end()
    }
}

/// Fetch pages from `token` until one holds records or the scan ends.
pub(crate) fn fetch_page(cluster: &dyn Cluster, table: TableId, mut token: ContinuationToken) -> Result<TablePage> {
    loop {
        let raw = cluster.enumerate_table(table, token)?;

        if !raw.is_empty() {
            let objects = decode_page(&raw).map_err(|e| {
                warn!("Discarding corrupt page from table {} at token {:?}: {}", table, token, e);
                e.with_context(&format!("table {} page at {:?}", table, token))
            })?;
            return Ok(TablePage {
                objects,
                next_token: raw.next_token,
            });
        }

        if raw.next_token.is_end() {
            return Ok(TablePage {
                objects: Vec::new(),
                next_token: ContinuationToken::END,
            });
        }

        // An empty page that does not advance the scan would repeat forever.
        if raw.next_token == token {
            return Err(Error::SystemicFailure(format!(
                "table {} scan stalled at token {:?}",
                table, token
            )));
        }

        debug!("Empty page from table {}, continuing at {:?}", table, raw.next_token);
        token = raw.next_token;
    }
}

/// Scan state as seen by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumeratorState {
    /// More objects may follow
    Active,
    /// The final page has been fetched and fully consumed
    Exhausted,
}

/// Cursor over every object in a table.
///
/// Not meant to be shared; each scan owns its buffer, read index and token.
/// Also usable as an `Iterator` of `Result<Object>`, which stops after the
/// first error.
pub struct TableEnumerator {
    cluster: Arc<dyn Cluster>,
    table: TableId,
    token: ContinuationToken,
    page: Vec<Object>,
    index: usize,
    failed: bool,
}

impl TableEnumerator {
    pub fn new(cluster: Arc<dyn Cluster>, table: TableId) -> Self {
        Self::resume(cluster, table, ContinuationToken::START)
    }

    /// Continue a scan from a token returned by an earlier page.
    pub fn resume(cluster: Arc<dyn Cluster>, table: TableId, token: ContinuationToken) -> Self {
        Self {
            cluster,
            table,
            token,
            page: Vec::new(),
            index: 0,
            failed: false,
        }
    }

    pub fn table(&self) -> TableId {
        self.table
    }

    /// Token that fetches the page after the buffered one
    pub fn next_token(&self) -> ContinuationToken {
        self.token
    }

    pub fn state(&self) -> EnumeratorState {
        if self.index < self.page.len() || !self.token.is_end() {
            EnumeratorState::Active
        } else {
            EnumeratorState::Exhausted
        }
    }

    /// Returns true if another object is available, fetching pages as needed.
    pub fn has_next(&mut self) -> Result<bool> {
        if self.index < self.page.len() {
            return Ok(true);
        }
        if self.token.is_end() {
            return Ok(false);
        }

        let page = fetch_page(self.cluster.as_ref(), self.table, self.token)?;
        self.token = page.next_token;
        self.page = page.objects;
        self.index = 0;
        Ok(!self.page.is_empty())
    }

    /// Return the next object, or `IterationExhausted` once the scan is done.
    pub fn next_object(&mut self) -> Result<Object> {
        if !self.has_next()? {
            return Err(Error::IterationExhausted);
        }
        let object = self.page[self.index].clone();
        self.index += 1;
        Ok(object)
    }
}

impl Iterator for TableEnumerator {
    type Item = Result<Object>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_object() {
            Ok(object) => Some(Ok(object)),
            Err(Error::IterationExhausted) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for TableEnumerator {}
