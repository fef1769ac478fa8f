//! One-shot calls to the synchronous endpoints.

use std::future::Future;
use std::io::Write;

use anyhow::Context;
use kamusi_client::{ClientSettings, DictionaryApi, HttpDictionaryClient};
use kamusi_core::{
    entry_view, result_view, BatchQueryRequest, QueryRequest, SearchRequest,
};

use super::render::{format_entry, format_result};

pub struct OneShot {
    runtime: tokio::runtime::Runtime,
    client: HttpDictionaryClient,
}

impl OneShot {
    pub fn new(settings: ClientSettings) -> anyhow::Result<Self> {
        let client = HttpDictionaryClient::new(settings)?;
        let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
        Ok(Self { runtime, client })
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn ask(&self, request: QueryRequest, out: &mut impl Write) -> anyhow::Result<()> {
        let result = self.block_on(self.client.query(&request))?;
        writeln!(out, "{}", format_result(&result_view(&result)))?;
        Ok(())
    }

    pub fn batch(&self, request: BatchQueryRequest, out: &mut impl Write) -> anyhow::Result<()> {
        let response = self.block_on(self.client.batch_query(&request))?;
        let total = response.total_queries;
        for (index, result) in response.results.iter().enumerate() {
            writeln!(out, "[{}/{}]", index + 1, total)?;
            writeln!(out, "{}\n", format_result(&result_view(result)))?;
        }
        writeln!(
            out,
            "{} queries in {:.0}ms",
            total, response.total_processing_time_ms
        )?;
        Ok(())
    }

    pub fn similar(&self, request: SearchRequest, out: &mut impl Write) -> anyhow::Result<()> {
        let response = self.block_on(self.client.search(&request))?;
        match response.processing_time_ms {
            Some(ms) => writeln!(out, "Entries similar to '{}' ({ms:.0}ms):", response.query)?,
            None => writeln!(out, "Entries similar to '{}':", response.query)?,
        }
        if response.results.is_empty() {
            writeln!(out, "  (none)")?;
        }
        for entry in &response.results {
            writeln!(out, "{}", format_entry(&entry_view(entry, false)))?;
        }
        Ok(())
    }
}
