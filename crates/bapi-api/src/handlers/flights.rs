//! Flight list handler (`BAPI_FLIGHT_GETLIST`)

use axum::extract::State;
use axum::Json;
use bapi_core::{FieldSet, FunctionCall, Message};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::handlers::ApiQuery;
use crate::state::AppState;

pub const FLIGHT_GETLIST: &str = "BAPI_FLIGHT_GETLIST";

/// Airline used when the query names none
const DEFAULT_AIRLINE: &str = "LH";

/// Query parameters for listing flights
#[derive(Debug, Default, Deserialize)]
pub struct FlightQuery {
    /// Airline code (e.g. "LH")
    pub airline: Option<String>,
    /// Upper bound on returned rows; 0 means no limit
    pub max_rows: Option<u32>,
}

/// One row of `FLIGHT_LIST`
#[derive(Debug, Serialize)]
pub struct Flight {
    pub airline_id: String,
    pub airline: String,
    pub connection_id: String,
    pub flight_date: String,
    pub airport_from: String,
    pub city_from: String,
    pub airport_to: String,
    pub city_to: String,
    pub departure_time: String,
    pub arrival_time: String,
}

impl Flight {
    fn from_row(row: &FieldSet) -> Self {
        let text = |name: &str| row.text(name).unwrap_or_default();
        Self {
            airline_id: text("AIRLINEID"),
            airline: text("AIRLINE"),
            connection_id: text("CONNECTID"),
            flight_date: text("FLIGHTDATE"),
            airport_from: text("AIRPORTFR"),
            city_from: text("CITYFROM"),
            airport_to: text("AIRPORTTO"),
            city_to: text("CITYTO"),
            departure_time: text("DEPTIME"),
            arrival_time: text("ARRTIME"),
        }
    }
}

/// Response for the flight list
#[derive(Debug, Serialize)]
pub struct FlightListResponse {
    pub flights: Vec<Flight>,
    pub messages: Vec<Message>,
}

/// GET /flights?airline=LH&max_rows=N
pub async fn list_flights(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<FlightQuery>,
) -> Result<Json<FlightListResponse>, ApiError> {
    let airline = query
        .airline
        .map(|a| a.trim().to_uppercase())
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| DEFAULT_AIRLINE.to_string());

    let mut call = FunctionCall::new(FLIGHT_GETLIST).scalar("AIRLINE", airline);
    if let Some(max_rows) = query.max_rows {
        call = call.scalar("MAX_ROWS", i64::from(max_rows));
    }

    let result = state.read(call).await?;
    let flights = result
        .table("FLIGHT_LIST")?
        .iter()
        .map(Flight::from_row)
        .collect();

    Ok(Json(FlightListResponse {
        flights,
        messages: result.messages,
    }))
}
