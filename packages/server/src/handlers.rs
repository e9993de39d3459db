//! HTTP handler functions for the dealer feed API.

use std::str::FromStr as _;

use actix_web::{HttpResponse, web};
use dealer_feed_ingest::{IngestError, IngestService};
use dealer_feed_pdf::PdfError;
use dealer_feed_server_models::{
    ApiBranches, ApiDistinctValues, ApiDomainData, ApiError, ApiHealth, ApiReportUpload,
    ApiReports, DistinctValuesParams, DomainDataParams, ReportQueryParams, ReportUploadParams,
};
use dealer_feed_source::filter::{RecordFilter, distinct_values};
use dealer_feed_source::{DataDomain, SourceError};

/// Suffix of the per-domain sheet resources (`sales-data`, `stock-data`, ...).
const DOMAIN_RESOURCE_SUFFIX: &str = "-data";

/// `GET /api/health`
pub async fn health(service: web::Data<IngestService>) -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        connected: service.is_connected(),
        last_probe_at: service.connectivity().last_probe_at(),
    })
}

/// `GET /api/sheets/branches`
pub async fn branches(service: web::Data<IngestService>) -> HttpResponse {
    HttpResponse::Ok().json(ApiBranches {
        branches: service
            .list_branches()
            .into_iter()
            .map(str::to_owned)
            .collect(),
    })
}

/// `GET /api/sheets/{domain}-data`
///
/// Fetches one data domain for a branch (or all branches), then applies
/// the optional search and date range.
pub async fn domain_data(
    service: web::Data<IngestService>,
    resource: web::Path<String>,
    params: web::Query<DomainDataParams>,
) -> HttpResponse {
    let Some(domain) = domain_of(&resource) else {
        return unknown_resource(&resource);
    };

    let params = params.into_inner();
    let branch = params.branch.filter(|b| !b.trim().is_empty());

    match service.get_domain_data(domain, branch.as_deref()).await {
        Ok(records) => {
            let data = RecordFilter::for_domain(domain)
                .search(params.search.as_deref().unwrap_or(""))
                .between(params.from, params.to)
                .apply(records);
            HttpResponse::Ok().json(ApiDomainData {
                total: data.len(),
                data,
                branch,
            })
        }
        Err(e) => ingest_error(&e, &format!("Failed to fetch {domain} data")),
    }
}

/// `GET /api/sheets/{domain}-data/values`
///
/// Lists the distinct values of one column (executives, models, ...) for
/// filter pickers.
pub async fn distinct_field_values(
    service: web::Data<IngestService>,
    resource: web::Path<String>,
    params: web::Query<DistinctValuesParams>,
) -> HttpResponse {
    let Some(domain) = domain_of(&resource) else {
        return unknown_resource(&resource);
    };

    let params = params.into_inner();
    let branch = params.branch.filter(|b| !b.trim().is_empty());

    match service.get_domain_data(domain, branch.as_deref()).await {
        Ok(records) => HttpResponse::Ok().json(ApiDistinctValues {
            values: distinct_values(&records, &params.field),
            field: params.field,
        }),
        Err(e) => ingest_error(&e, &format!("Failed to fetch {domain} data")),
    }
}

/// `POST /api/service/reports`
///
/// Accepts the raw report bytes as the request body.
pub async fn upload_report(
    service: web::Data<IngestService>,
    params: web::Query<ReportUploadParams>,
    body: web::Bytes,
) -> HttpResponse {
    let params = params.into_inner();

    match service
        .ingest_service_report(&params.file_name, body.to_vec(), &params.branch, params.date)
        .await
    {
        Ok(upload) => HttpResponse::Ok().json(ApiReportUpload {
            count: upload.count,
            header_found: upload.header_found,
            rows: upload.rows,
        }),
        Err(e) => ingest_error(&e, "Failed to ingest service report"),
    }
}

/// `GET /api/service/reports`
pub async fn reports(
    service: web::Data<IngestService>,
    params: web::Query<ReportQueryParams>,
) -> HttpResponse {
    match service
        .get_reports(params.branch.as_deref(), params.date)
        .await
    {
        Ok(data) => HttpResponse::Ok().json(ApiReports {
            total: data.len(),
            data,
        }),
        Err(e) => ingest_error(&e, "Failed to query service reports"),
    }
}

fn domain_of(resource: &str) -> Option<DataDomain> {
    resource
        .strip_suffix(DOMAIN_RESOURCE_SUFFIX)
        .and_then(|name| DataDomain::from_str(name).ok())
}

fn unknown_resource(resource: &str) -> HttpResponse {
    error_json(
        HttpResponse::NotFound(),
        format!("Unknown sheet resource: {resource}"),
    )
}

fn error_json(mut builder: actix_web::HttpResponseBuilder, error: String) -> HttpResponse {
    builder.json(ApiError { error })
}

/// Client mistakes map to 400; everything else is a server error.
fn ingest_error(e: &IngestError, context: &str) -> HttpResponse {
    match e {
        IngestError::Source(SourceError::UnknownBranch(_))
        | IngestError::Pdf(PdfError::UnsupportedFormat(_) | PdfError::Extraction(_)) => {
            log::warn!("{context}: {e}");
            error_json(HttpResponse::BadRequest(), e.to_string())
        }
        _ => {
            log::error!("{context}: {e}");
            error_json(HttpResponse::InternalServerError(), context.to_owned())
        }
    }
}
