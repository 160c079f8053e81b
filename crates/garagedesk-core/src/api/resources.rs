//! Typed access to the shop's resource collections.
//!
//! These calls carry no logic of their own; they pass through
//! [`ApiClient`] and so inherit its credential handling.

use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{
    Appointment, Customer, Employee, InventoryItem, Invoice, JobCard, JobStatus, ListResponse,
    Vehicle,
};

use super::{endpoints, ApiClient, ApiError, ApiRequest};

/// Stop following `next` links after this many pages.
const MAX_PAGES: usize = 100;

/// One REST collection, e.g. `/clients/`.
pub struct Resource<T> {
    api: ApiClient,
    collection: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            collection: self.collection,
            _marker: PhantomData,
        }
    }
}

impl<T> Resource<T>
where
    T: DeserializeOwned + Serialize,
{
    pub fn new(api: ApiClient, collection: &'static str) -> Self {
        Self {
            api,
            collection,
            _marker: PhantomData,
        }
    }

    pub fn collection(&self) -> &'static str {
        self.collection
    }

    /// First page (or the whole collection when the backend does not paginate)
    pub async fn list(&self) -> Result<Vec<T>, ApiError> {
        let page: ListResponse<T> = self.api.get_json(self.collection).await?;
        Ok(page.into_items())
    }

    /// Every page, following `next` links
    pub async fn list_all(&self) -> Result<Vec<T>, ApiError> {
        let mut items = Vec::new();
        let mut next = Some(self.collection.to_string());
        let mut pages = 0;

        while let Some(url) = next.take() {
            if !self.api.is_api_url(&url) {
                warn!(collection = self.collection, next = %url, "Refusing to follow next link outside the API");
                return Err(ApiError::InvalidResponse(format!(
                    "{}: next link {} is outside the API root",
                    self.collection, url
                )));
            }
            let page: ListResponse<T> = self.api.get_json(&url).await?;
            next = page.next_page().map(str::to_string);
            items.extend(page.into_items());

            pages += 1;
            if pages >= MAX_PAGES {
                if next.is_some() {
                    warn!(collection = self.collection, pages, "Page limit reached, truncating list");
                }
                break;
            }
        }

        debug!(collection = self.collection, count = items.len(), pages, "Fetched collection");
        Ok(items)
    }

    pub async fn get(&self, id: i64) -> Result<T, ApiError> {
        self.api.get_json(&endpoints::member(self.collection, id)).await
    }

    pub async fn create(&self, item: &T) -> Result<T, ApiError> {
        self.api.post_json(self.collection, item).await
    }

    pub async fn update(&self, id: i64, item: &T) -> Result<T, ApiError> {
        self.api
            .put_json(&endpoints::member(self.collection, id), item)
            .await
    }

    /// Partial update with an arbitrary JSON object
    pub async fn patch(&self, id: i64, fields: &Value) -> Result<T, ApiError> {
        self.api
            .patch_json(&endpoints::member(self.collection, id), fields)
            .await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.api.delete(&endpoints::member(self.collection, id)).await
    }

    /// List filtered by query parameters, e.g. `[("client", "4")]`
    pub async fn filter(&self, params: &[(&str, &str)]) -> Result<Vec<T>, ApiError> {
        let request = params
            .iter()
            .fold(ApiRequest::get(self.collection), |req, (k, v)| req.with_query(*k, *v));
        let page: ListResponse<T> = self.api.request_json(request).await?;
        Ok(page.into_items())
    }
}

/// Entry point to every shop collection, sharing one [`ApiClient`].
#[derive(Clone)]
pub struct ShopApi {
    api: ApiClient,
}

impl ShopApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn client(&self) -> &ApiClient {
        &self.api
    }

    pub fn customers(&self) -> Resource<Customer> {
        Resource::new(self.api.clone(), endpoints::CLIENTS)
    }

    pub fn vehicles(&self) -> Resource<Vehicle> {
        Resource::new(self.api.clone(), endpoints::VEHICLES)
    }

    pub fn employees(&self) -> Resource<Employee> {
        Resource::new(self.api.clone(), endpoints::EMPLOYEES)
    }

    pub fn job_cards(&self) -> Resource<JobCard> {
        Resource::new(self.api.clone(), endpoints::JOB_CARDS)
    }

    pub fn inventory(&self) -> Resource<InventoryItem> {
        Resource::new(self.api.clone(), endpoints::INVENTORY)
    }

    pub fn appointments(&self) -> Resource<Appointment> {
        Resource::new(self.api.clone(), endpoints::APPOINTMENTS)
    }

    pub fn invoices(&self) -> Resource<Invoice> {
        Resource::new(self.api.clone(), endpoints::INVOICES)
    }

    /// Vehicles owned by one client
    pub async fn vehicles_for(&self, client_id: i64) -> Result<Vec<Vehicle>, ApiError> {
        let id = client_id.to_string();
        self.vehicles().filter(&[("client", id.as_str())]).await
    }

    /// PATCH a job card's status (the board's drop action)
    pub async fn set_job_status(&self, id: i64, status: JobStatus) -> Result<JobCard, ApiError> {
        self.job_cards()
            .patch(id, &serde_json::json!({ "status": status }))
            .await
    }
}
