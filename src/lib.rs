pub mod core;
pub mod index;
pub mod persist;
pub mod query;
pub mod store;

/*
┌─────────────────────────────────────────────────────────────────────────────┐
│                         ROWDEX STRUCT ARCHITECTURE                          │
└─────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────────── CORE LAYER ───────────────────────────────┐
│                                                                             │
│  ┌───────────────────────────────────────────────────────────────────┐     │
│  │                          struct Table                             │     │
│  │  ┌─────────────────────────────────────────────────────────────┐ │     │
│  │  │ state: RwLock<TableState>      // whole-store RW lock       │ │     │
│  │  │ patterns: RegexCache           // own lock, LRU-bounded     │ │     │
│  │  │ reaper: Mutex<Option<ReaperHandle>> // at most one          │ │     │
│  │  └─────────────────────────────────────────────────────────────┘ │     │
│  └───────────────────────────────────────────────────────────────────┘     │
│                                                                             │
│  ┌──────────────────────────────────────────────────────────────────┐      │
│  │                       struct TableState                          │      │
│  │  data:      HashMap<RowId, Row>         // primary store        │      │
│  │  expire_at: HashMap<RowId, DateTime>    // per-row expiry       │      │
│  │  keys:      TypeRegistry                // field → FieldKind    │      │
│  │  indexes:   TypedIndexes                // 4 inverted indexes   │      │
│  │  ttl:       TimeDelta                   // applied at insert    │      │
│  └──────────────────────────────────────────────────────────────────┘      │
│                                                                             │
│  ┌──────────────────┐  ┌──────────────────┐  ┌──────────────────────┐      │
│  │ struct RowId     │  │ enum FieldValue  │  │ enum Value (dynamic) │      │
│  │ • 0: Uuid        │  │ • Text(String)   │  │ • scalars + Uuid     │      │
│  └──────────────────┘  │ • Number(f64)    │  │ • Instant            │      │
│                        │ • Bool(bool)     │  │ • List / Object      │      │
│                        │ • Instant(Utc)   │  │   (flattened)        │      │
│                        └──────────────────┘  └──────────────────────┘      │
└─────────────────────────────────────────────────────────────────────────────┘

┌───────────────────────────────── INDEX LAYER ───────────────────────────────┐
│                                                                             │
│  ┌──────────────────────────────────────────────────────────────────┐      │
│  │                       struct TypedIndexes                        │      │
│  │  strings:  field → value → IdSet       (HashMap)                 │      │
│  │  numbers:  field → value → IdSet       (BTreeMap, range scans)   │      │
│  │  bools:    field → value → IdSet       (HashMap)                 │      │
│  │  instants: field → value → IdSet       (BTreeMap, range scans)   │      │
│  └──────────────────────────────────────────────────────────────────┘      │
│                                                                             │
│  struct TypeRegistry: first observation commits a field's kind;            │
│  conflicting inserts drop the field (logged), row still lands.             │
└─────────────────────────────────────────────────────────────────────────────┘

┌───────────────────────────────── QUERY LAYER ───────────────────────────────┐
│                                                                             │
│  filter(op, key, value, options) → Table   // index-driven, never scans D  │
│  find_first_by_field(key)                  // pattern keys like filter     │
│  explain(op, key, value) → Explain         // estimates from index stats   │
│                                                                             │
│  enum Operator: Equals … NotEndsWith (20)  // typed per committed kind     │
│  struct RegexCache: LruCache<String, Regex> behind its own RwLock          │
└─────────────────────────────────────────────────────────────────────────────┘

┌────────────────────────────── LIFECYCLE & PERSIST ──────────────────────────┐
│                                                                             │
│  reaper: 1 s tick, collect expired under read lock, remove per-row         │
│          under write lock; stop channel answers within one tick            │
│                                                                             │
│  save / save_compressed / save_to_writer      // bincode (+ gzip),         │
│  load / load_compressed / load_from_reader    // atomic rename, versioned  │
│  export_text / import_text                    // JSON, indexes rebuilt     │
└─────────────────────────────────────────────────────────────────────────────┘

RELATIONSHIPS

  Table ──guards──> TableState ──owns──> TypedIndexes + TypeRegistry
    │
    ├──consults──> RegexCache  (RegExp predicates, pattern keys, explain)
    │
    ├──spawns──> reaper thread ──calls──> remove_row (cascade + prune)
    │
    └──filter──> new Table     (matching rows re-inserted, re-indexed)
*/
