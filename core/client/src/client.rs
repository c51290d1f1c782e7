use monai_cloud_types::{
    Dataset,
    DatasetFilter,
    Experiment,
    ExperimentFilter,
    NewDataset,
    NewExperiment,
    ValidationError,
};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::error::ApiError;
use crate::session::{parse_host, Session};

/// A top level resource kind living under `/api/v1/users/{uid}/{COLLECTION}`.
pub trait Resource: DeserializeOwned + Send {
    /// Path segment of the collection, also the key a wrapped listing is stored under.
    const COLLECTION: &'static str;
    /// Human readable name used in logs.
    const KIND: &'static str;

    /// Payload accepted by create.
    type New: Serialize + Sync;
    /// Query parameters accepted by list.
    type Filter: Serialize + Sync + Default;

    fn id(&self) -> &str;

    /// Client side checks run before a create request is sent.
    fn validate(_new: &Self::New) -> Result<(), ValidationError> {
        Ok(())
    }
}

impl Resource for Dataset {
    const COLLECTION: &'static str = "datasets";
    const KIND: &'static str = "dataset";

    type New = NewDataset;
    type Filter = DatasetFilter;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(new: &NewDataset) -> Result<(), ValidationError> {
        new.validate()
    }
}

impl Resource for Experiment {
    const COLLECTION: &'static str = "experiments";
    const KIND: &'static str = "experiment";

    type New = NewExperiment;
    type Filter = ExperimentFilter;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(new: &NewExperiment) -> Result<(), ValidationError> {
        new.validate()
    }
}

/// Authenticated client for the MONAI Cloud REST API.
///
/// Every call is a single request: nothing is retried, and any status other than the one the
/// endpoint documents is returned as an error carrying the server's body.
pub struct ApiClient {
    http: Client,
    session: Session,
}

impl ApiClient {
    pub fn new(http: Client, session: Session) -> Self {
        Self { http, session }
    }

    /// Logs in and returns a client bound to the new session.
    pub async fn login(http: Client, host: &str, api_key: &str) -> Result<Self, ApiError> {
        let host = parse_host(host)?;
        let session = Session::login(&http, &host, api_key).await?;
        Ok(Self { http, session })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn create<R: Resource>(&self, payload: &R::New) -> Result<R, ApiError> {
        R::validate(payload)?;
        let url = self.session.endpoint(&[R::COLLECTION])?;
        let response = self
            .send(Method::POST, url, StatusCode::CREATED, |req| {
                req.json(payload)
            })
            .await?;
        let resource: R = response.json().await?;
        info!("created {} {}", R::KIND, resource.id());
        Ok(resource)
    }

    pub async fn list<R: Resource>(&self, filter: &R::Filter) -> Result<Vec<R>, ApiError> {
        let url = self.session.endpoint(&[R::COLLECTION])?;
        let response = self
            .send(Method::GET, url, StatusCode::OK, |req| req.query(filter))
            .await?;
        decode_listing(response.json().await?, R::COLLECTION)
    }

    pub async fn get<R: Resource>(&self, id: &str) -> Result<R, ApiError> {
        let url = self.session.endpoint(&[R::COLLECTION, id])?;
        let response = self.send(Method::GET, url, StatusCode::OK, |req| req).await?;
        Ok(response.json().await?)
    }

    /// Deletes a resource. The server refuses to delete a dataset that an experiment still
    /// references; that refusal comes back as [`ApiError::UnexpectedStatus`].
    pub async fn delete<R: Resource>(&self, id: &str) -> Result<(), ApiError> {
        let url = self.session.endpoint(&[R::COLLECTION, id])?;
        self.send(Method::DELETE, url, StatusCode::OK, |req| req)
            .await?;
        info!("deleted {} {id}", R::KIND);
        Ok(())
    }

    pub async fn create_dataset(&self, dataset: &NewDataset) -> Result<Dataset, ApiError> {
        self.create::<Dataset>(dataset).await
    }

    pub async fn create_experiment(
        &self,
        experiment: &NewExperiment,
    ) -> Result<Experiment, ApiError> {
        self.create::<Experiment>(experiment).await
    }

    /// Sends an authorized request and checks its status against `expected`.
    pub(crate) async fn send<F>(
        &self,
        method: Method,
        url: Url,
        expected: StatusCode,
        build: F,
    ) -> Result<Response, ApiError>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        debug!("{method} {url}");
        let request = self.session.authorize(self.http.request(method.clone(), url.clone()));
        let response = build(request).send().await?;

        let status = response.status();
        if status == expected {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Unauthorized { status, body });
        }
        Err(ApiError::UnexpectedStatus {
            method,
            url: url.to_string(),
            expected,
            status,
            body,
        })
    }
}

/// Listings come back either as a bare array or wrapped in an object under the collection name.
pub(crate) fn decode_listing<R: DeserializeOwned>(
    value: serde_json::Value,
    key: &str,
) -> Result<Vec<R>, ApiError> {
    match value {
        serde_json::Value::Array(_) => Ok(serde_json::from_value(value)?),
        serde_json::Value::Object(mut map) => match map.remove(key) {
            Some(items @ serde_json::Value::Array(_)) => Ok(serde_json::from_value(items)?),
            _ => Err(ApiError::UnexpectedBody(format!(
                "expected a list of {key}"
            ))),
        },
        other => Err(ApiError::UnexpectedBody(format!(
            "expected a list of {key}, got {other}"
        ))),
    }
}
