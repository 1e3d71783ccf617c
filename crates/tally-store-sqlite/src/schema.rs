//! SQL schema for the Tally SQLite ledger.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.
//!
//! The uniqueness model deliberately avoids a single global constraint on
//! `(class, value)`: permanent values must stay blocked forever while a
//! released renewable value must become claimable again, so one logical
//! constraint is split into two non-overlapping partial unique indexes over
//! the same table.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;

CREATE TABLE IF NOT EXISTS operations (
    operation_id       TEXT PRIMARY KEY,
    state              TEXT NOT NULL DEFAULT 'open',  -- 'open' | 'closed'
    created_at         TEXT NOT NULL,                 -- ISO 8601 UTC; server-assigned
    closed_at          TEXT,

    -- Normalized field set; multi-valued fields in joined canonical form.
    shipment_order     TEXT,
    booking            TEXT,
    awb                TEXT,
    thermographs       TEXT,
    security_seals     TEXT,
    customs_seal       TEXT,
    operator_seal      TEXT,
    sanitary_cert      TEXT,
    line_seal          TEXT,
    sanitary_line_seal TEXT,
    customs_ref        TEXT,

    -- Opaque catalog references resolved by the intake layer.
    driver_ref         TEXT,
    vehicle_ref        TEXT,
    carrier_ref        TEXT
);

-- Claims are append-only. The only UPDATE ever issued against this table is
-- the release of renewable claims (active -> 0, released_at set); no DELETE.
CREATE TABLE IF NOT EXISTS claims (
    claim_id     TEXT    PRIMARY KEY,
    operation_id TEXT    NOT NULL REFERENCES operations(operation_id),
    class        TEXT    NOT NULL,  -- IdentifierClass discriminant
    value        TEXT    NOT NULL,  -- canonical (normalized) string
    lifetime     TEXT    NOT NULL CHECK (lifetime IN ('permanent', 'renewable')),
    active       INTEGER NOT NULL DEFAULT 1,
    origin       TEXT,
    actor        TEXT,
    created_at   TEXT    NOT NULL,
    released_at  TEXT,
    CHECK ((active = 0) = (released_at IS NOT NULL))
);

-- A permanent pair exists at most once for the life of the ledger.
CREATE UNIQUE INDEX IF NOT EXISTS claims_permanent_uq
    ON claims(class, value) WHERE lifetime = 'permanent';

-- A renewable pair has at most one active row at any instant; any number of
-- released historical rows for the same pair may coexist.
CREATE UNIQUE INDEX IF NOT EXISTS claims_renewable_active_uq
    ON claims(class, value) WHERE lifetime = 'renewable' AND active = 1;

CREATE INDEX IF NOT EXISTS claims_operation_idx ON claims(operation_id);
CREATE INDEX IF NOT EXISTS claims_pair_idx      ON claims(class, value);
CREATE INDEX IF NOT EXISTS operations_state_idx ON operations(state);

PRAGMA user_version = 1;
";
