//! Committed state, call journal and fault injection of the simulated system

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use bapi_core::{FieldSet, FunctionCall, Message};
use chrono::NaiveDate;
use parking_lot::Mutex;

use crate::signatures::{ADDRESS_FIELDS, BP_HEADER_FIELDS, LOGON_FIELDS};

/// First number of the business partner number range
const PARTNER_RANGE_START: u64 = 100_000_000;

/// A stored user master record
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub address: FieldSet,
    pub logon: FieldSet,
    pub password: String,
    pub roles: Vec<String>,
}

impl UserRecord {
    pub fn new(first: &str, last: &str, email: &str) -> Self {
        let mut address = blank(ADDRESS_FIELDS);
        address.set("FIRSTNAME", first);
        address.set("LASTNAME", last);
        address.set("E_MAIL", email);
        let mut logon = blank(LOGON_FIELDS);
        logon.set("USTYP", "A");
        logon.set("CLASS", "DEFAULT");
        Self {
            address,
            logon,
            password: String::new(),
            roles: Vec::new(),
        }
    }
}

/// One-shot replacement for the next execution of a function
#[derive(Debug, Clone)]
pub enum Script {
    /// Return exactly these `RETURN` messages and do nothing else
    Messages(Vec<Message>),
    /// Raise an exception on the backend
    RuntimeError(String),
    /// Drop the connection mid-call
    Disconnect,
}

/// A buffered change of one logical unit of work
#[derive(Debug, Clone)]
pub(crate) enum Change {
    PutPartner(String, FieldSet),
    RemovePartner(String),
    PutUser(String, UserRecord),
    RemoveUser(String),
}

#[derive(Default)]
pub(crate) struct State {
    pub partners: BTreeMap<String, FieldSet>,
    pub users: BTreeMap<String, UserRecord>,
    pub flights: Vec<FieldSet>,
    next_partner: u64,
}

/// A structure with every declared field present and empty
pub(crate) fn blank(fields: &[&str]) -> FieldSet {
    fields.iter().map(|f| (*f, "")).collect()
}

/// The simulated backend system shared by all its connections
pub struct SimulatedSystem {
    state: Mutex<State>,
    journal: Mutex<Vec<FunctionCall>>,
    journaling: AtomicBool,
    scripts: Mutex<HashMap<String, VecDeque<Script>>>,
    unreachable: AtomicBool,
}

impl Default for SimulatedSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedSystem {
    /// An empty system
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                next_partner: PARTNER_RANGE_START,
                ..Default::default()
            }),
            journal: Mutex::new(Vec::new()),
            journaling: AtomicBool::new(false),
            scripts: Mutex::new(HashMap::new()),
            unreachable: AtomicBool::new(false),
        }
    }

    /// A system seeded with a few partners, users and flights
    pub fn with_demo_data() -> Self {
        let system = Self::new();

        for (company, city, country, email) in [
            ("SAP", "Walldorf", "DE", "info@sap.example"),
            ("Becker Berlin", "Berlin", "DE", "contact@becker.example"),
            ("Laurent Paris", "Paris", "FR", "bonjour@laurent.example"),
        ] {
            let mut header = blank(BP_HEADER_FIELDS);
            header.set("BP_ROLE", "01");
            header.set("COMPANY_NAME", company);
            header.set("CITY", city);
            header.set("COUNTRY", country);
            header.set("EMAIL_ADDRESS", email);
            header.set("CURRENCY_CODE", "EUR");
            header.set("ADDRESS_TYPE", "1");
            system.insert_partner(header);
        }

        let mut developer = UserRecord::new("Dev", "Eloper", "developer@example.com");
        developer.password = "Down1oad".to_string();
        developer.roles = vec!["SAP_BC_DWB_ABAPDEVELOPER".to_string()];
        system.insert_user("DEVELOPER", developer);

        let date = |d: u32| NaiveDate::from_ymd_opt(2026, 11, d).unwrap_or_default();
        for (airline, name, conn, day, from, city_from, to, city_to, dep, arr) in [
            ("LH", "Lufthansa", "0400", 2, "FRA", "FRANKFURT", "JFK", "NEW YORK", "10:10:00", "11:34:00"),
            ("LH", "Lufthansa", "0401", 3, "JFK", "NEW YORK", "FRA", "FRANKFURT", "18:30:00", "07:45:00"),
            ("LH", "Lufthansa", "2402", 4, "FRA", "FRANKFURT", "SXF", "BERLIN", "10:30:00", "11:35:00"),
            ("AA", "American Airlines", "0017", 2, "JFK", "NEW YORK", "SFO", "SAN FRANCISCO", "13:30:00", "16:31:00"),
            ("AZ", "Alitalia", "0555", 5, "FCO", "ROME", "FRA", "FRANKFURT", "19:00:00", "21:05:00"),
        ] {
            let row = FieldSet::new()
                .with("AIRLINEID", airline)
                .with("AIRLINE", name)
                .with("CONNECTID", conn)
                .with("FLIGHTDATE", date(day))
                .with("AIRPORTFR", from)
                .with("CITYFROM", city_from)
                .with("AIRPORTTO", to)
                .with("CITYTO", city_to)
                .with("DEPTIME", dep)
                .with("ARRTIME", arr);
            system.insert_flight(row);
        }

        system
    }

    /// Store a partner directly (committed), allocating its number
    pub fn insert_partner(&self, mut header: FieldSet) -> String {
        let mut state = self.state.lock();
        let id = allocate(&mut state);
        header.set("BP_ID", id.as_str());
        state.partners.insert(id.clone(), header);
        id
    }

    pub fn insert_user(&self, username: &str, record: UserRecord) {
        self.state.lock().users.insert(username.to_string(), record);
    }

    pub fn insert_flight(&self, row: FieldSet) {
        self.state.lock().flights.push(row);
    }

    /// Committed partner data
    pub fn partner(&self, id: &str) -> Option<FieldSet> {
        self.state.lock().partners.get(id).cloned()
    }

    pub fn partner_count(&self) -> usize {
        self.state.lock().partners.len()
    }

    /// Committed user data
    pub fn user(&self, username: &str) -> Option<UserRecord> {
        self.state.lock().users.get(username).cloned()
    }

    /// Queue a one-shot script for the next execution of `function`
    pub fn script(&self, function: &str, script: Script) {
        self.scripts
            .lock()
            .entry(function.to_string())
            .or_default()
            .push_back(script);
    }

    /// Make every connect, lookup and call fail at the transport level
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn is_unreachable(&self) -> bool {
        self.unreachable.load(Ordering::SeqCst)
    }

    /// Keep a journal of executed calls, including their full parameters.
    /// Off by default; only tests should turn it on.
    pub fn with_journal(self) -> Self {
        self.set_journaling(true);
        self
    }

    pub fn set_journaling(&self, enabled: bool) {
        self.journaling.store(enabled, Ordering::SeqCst);
        if !enabled {
            self.journal.lock().clear();
        }
    }

    pub fn is_journaling(&self) -> bool {
        self.journaling.load(Ordering::SeqCst)
    }

    /// Every executed call since journaling was enabled, in execution order
    pub fn journal(&self) -> Vec<FunctionCall> {
        self.journal.lock().clone()
    }

    pub fn journal_names(&self) -> Vec<String> {
        self.journal
            .lock()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    /// How many times `function` was executed
    pub fn calls_to(&self, function: &str) -> usize {
        self.journal
            .lock()
            .iter()
            .filter(|c| c.name() == function)
            .count()
    }

    pub fn clear_journal(&self) {
        self.journal.lock().clear();
    }

    pub(crate) fn record(&self, call: &FunctionCall) {
        if self.is_journaling() {
            self.journal.lock().push(call.clone());
        }
    }

    pub(crate) fn take_script(&self, function: &str) -> Option<Script> {
        self.scripts
            .lock()
            .get_mut(function)
            .and_then(VecDeque::pop_front)
    }

    /// Numbers are drawn immediately and never returned, even on rollback
    pub(crate) fn next_partner_id(&self) -> String {
        allocate(&mut self.state.lock())
    }

    pub(crate) fn read<T>(&self, f: impl FnOnce(&State) -> T) -> T {
        f(&self.state.lock())
    }

    pub(crate) fn apply(&self, changes: Vec<Change>) {
        let mut state = self.state.lock();
        for change in changes {
            match change {
                Change::PutPartner(id, header) => {
                    state.partners.insert(id, header);
                }
                Change::RemovePartner(id) => {
                    state.partners.remove(&id);
                }
                Change::PutUser(name, record) => {
                    state.users.insert(name, record);
                }
                Change::RemoveUser(name) => {
                    state.users.remove(&name);
                }
            }
        }
    }
}

fn allocate(state: &mut State) -> String {
    let id = format!("{:010}", state.next_partner);
    state.next_partner += 1;
    id
}
