//! Pattern rules for PHP sources. Each rule is a regex paired with the
//! function that folds its captures into the target record, so every rule
//! can be exercised on its own.

use regex::Captures;

use super::{
    Cast, Column, Controller, ControllerMethod, ForeignReference, Migration, MigrationIndex, Model,
    Provider, Relationship, RelationshipType, Route,
};
use crate::analysers::pattern::{Rule, RuleSet};
use crate::error::Result;

/// Items of a bracketed PHP list, with quotes and whitespace trimmed.
pub fn block_items(block: &str) -> Vec<String> {
    block
        .split(',')
        .map(trim_item)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn trim_item(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || c == '\'' || c == '"')
}

/// `Post::class`, `'App\Models\Post'` and `\App\Models\Post::class` all name `Post`.
pub fn class_name(arg: &str) -> String {
    let arg = trim_item(arg);
    let arg = arg.strip_suffix("::class").unwrap_or(arg);
    arg.rsplit('\\').next().unwrap_or(arg).to_string()
}

/// Split on commas outside brackets, parentheses and quotes.
pub fn split_arguments(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut current = String::new();
    for c in s.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (None, '\'' | '"') => quote = Some(c),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// `->name(args)` calls of a fluent chain, in order.
fn chain_calls(chain: &str) -> Vec<(String, String)> {
    let mut calls = Vec::new();
    let mut rest = chain;
    while let Some(start) = rest.find("->") {
        rest = rest[start + 2..].trim_start();
        let Some(open) = rest.find('(') else { break };
        let name = rest[..open].trim().to_string();
        let Some(close) = rest[open..].find(')') else { break };
        calls.push((name, rest[open + 1..open + close].trim().to_string()));
        rest = &rest[open + close + 1..];
    }
    calls
}

pub fn model_rules() -> Result<RuleSet<Model>> {
    Ok(RuleSet::new(vec![
        Rule::<Model>::first(
            "table",
            r#"protected\s+\$table\s*=\s*['"](?P<table>[^'"]+)['"]"#,
            |m, caps| m.table = Some(caps["table"].to_string()),
        )?,
        Rule::<Model>::first(
            "fillable",
            r"(?s)protected\s+\$fillable\s*=\s*\[(?P<items>.*?)\]",
            |m, caps| m.fillable = block_items(&caps["items"]),
        )?,
        Rule::<Model>::first(
            "hidden",
            r"(?s)protected\s+\$hidden\s*=\s*\[(?P<items>.*?)\]",
            |m, caps| m.hidden = block_items(&caps["items"]),
        )?,
        Rule::<Model>::first(
            "casts",
            r"(?s)protected\s+\$casts\s*=\s*\[(?P<items>.*?)\]",
            apply_casts,
        )?,
        Rule::<Model>::each(
            "relationship",
            r"public\s+function\s+(?P<method>\w+)\s*\(\s*\)\s*(?::\s*[\w\\]+\s*)?\{\s*return\s+\$this\s*->\s*(?P<kind>belongsToMany|hasMany|hasOne|belongsTo)\s*\((?P<args>[^)]*)\)",
            apply_relationship,
        )?,
    ]))
}

fn apply_casts(model: &mut Model, caps: &Captures) {
    for item in split_arguments(&caps["items"]) {
        let Some((field, cast)) = item.split_once("=>") else {
            continue;
        };
        let field = trim_item(field);
        let cast = trim_item(cast);
        if field.is_empty() || cast.is_empty() {
            continue;
        }
        let cast_type = match cast.strip_suffix("::class") {
            Some(class) => class.rsplit('\\').next().unwrap_or(class).to_string(),
            None => cast.to_string(),
        };
        model.casts.push(Cast {
            field: field.to_string(),
            cast_type,
        });
    }
}

fn apply_relationship(model: &mut Model, caps: &Captures) {
    let Some(kind) = RelationshipType::from_method(&caps["kind"]) else {
        return;
    };
    let args = split_arguments(&caps["args"]);
    let Some(related) = args.first() else {
        return;
    };
    let arg = |i: usize| {
        args.get(i)
            .map(|a| trim_item(a).to_string())
            .filter(|a| !a.is_empty())
    };

    // belongsToMany(related, table, foreignPivotKey, relatedPivotKey)
    let (pivot_table, foreign_key, local_key) = match kind {
        RelationshipType::BelongsToMany => (arg(1), arg(2), arg(3)),
        _ => (None, arg(1), arg(2)),
    };
    model.relationships.push(Relationship {
        kind,
        method: caps["method"].to_string(),
        related_model: class_name(related),
        foreign_key,
        local_key,
        pivot_table,
    });
}

pub fn controller_rules() -> Result<RuleSet<Controller>> {
    Ok(RuleSet::new(vec![
        Rule::<Controller>::each(
            "method",
            r"public\s+function\s+(?P<name>\w+)\s*\((?P<params>[^)]*)\)(?:\s*:\s*(?P<returns>\??[\w\\|]+))?",
            |c, caps| {
                let name = &caps["name"];
                if name.starts_with("__") {
                    return;
                }
                c.methods.push(ControllerMethod {
                    name: name.to_string(),
                    parameters: split_arguments(&caps["params"]),
                    return_type: caps.name("returns").map(|m| m.as_str().to_string()),
                });
            },
        )?,
        Rule::<Controller>::each(
            "middleware",
            r#"\$this\s*->\s*middleware\(\s*['"](?P<middleware>[^'"]+)['"]"#,
            |c, caps| c.middleware.push(caps["middleware"].to_string()),
        )?,
        Rule::<Controller>::each(
            "model_import",
            r"use\s+\\?App\\Models\\(?P<model>\w+)\s*;",
            |c, caps| c.models.push(caps["model"].to_string()),
        )?,
    ]))
}

pub fn route_rules() -> Result<RuleSet<Vec<Route>>> {
    Ok(RuleSet::new(vec![Rule::<Vec<Route>>::each(
        "route",
        concat!(
            r#"Route::(?P<verb>get|post|put|patch|delete)\s*\(\s*['"](?P<uri>[^'"]+)['"]\s*,\s*"#,
            r#"(?:\[\s*\\?(?P<array_controller>[\w\\]+)::class\s*,\s*['"](?P<array_action>\w+)['"]\s*\]"#,
            r#"|['"](?P<string_controller>[\w\\]+)@(?P<string_action>\w+)['"]"#,
            r#"|\\?(?P<invokable>[\w\\]+)::class)\s*\)"#,
            r#"(?P<chain>(?:\s*->\s*\w+\([^)]*\))*)"#,
        ),
        apply_route,
    )?]))
}

fn apply_route(routes: &mut Vec<Route>, caps: &Captures) {
    let controller = caps
        .name("array_controller")
        .or_else(|| caps.name("string_controller"))
        .or_else(|| caps.name("invokable"))
        .map(|m| class_name(m.as_str()));
    let action = caps
        .name("array_action")
        .or_else(|| caps.name("string_action"))
        .map(|m| m.as_str().to_string())
        .or_else(|| caps.name("invokable").map(|_| "__invoke".to_string()));

    let mut route = Route {
        method: caps["verb"].to_uppercase(),
        uri: caps["uri"].to_string(),
        controller,
        action,
        ..Default::default()
    };
    for (call, args) in chain_calls(caps.name("chain").map_or("", |m| m.as_str())) {
        match call.as_str() {
            "name" => route.name = Some(trim_item(&args).to_string()),
            "middleware" => route
                .middleware
                .extend(block_items(args.trim_matches(|c| c == '[' || c == ']'))),
            _ => {}
        }
    }
    routes.push(route);
}

pub fn migration_rules() -> Result<RuleSet<Migration>> {
    Ok(RuleSet::new(vec![
        Rule::<Migration>::first(
            "table",
            r#"Schema::(?:create|table)\(\s*['"](?P<table>[^'"]+)['"]"#,
            |m, caps| m.table = caps["table"].to_string(),
        )?,
        Rule::<Migration>::each(
            "composite_index",
            r"\$table->(?P<kind>index|unique|primary)\(\s*\[(?P<columns>[^\]]*)\]",
            |m, caps| {
                m.indexes.push(MigrationIndex {
                    kind: caps["kind"].to_string(),
                    columns: block_items(&caps["columns"]),
                })
            },
        )?,
        Rule::<Migration>::each(
            "column",
            r#"\$table->(?P<helper>\w+)\(\s*(?:['"](?P<name>[^'"]*)['"])?\s*(?:,\s*(?P<args>[^)]*))?\)(?P<chain>(?:\s*->\s*\w+\([^)]*\))*)\s*;"#,
            apply_column,
        )?,
    ]))
}

/// Column helpers that take no name argument.
fn implicit_columns(helper: &str) -> &'static [(&'static str, &'static str)] {
    match helper {
        "id" => &[("id", "id")],
        "timestamps" | "nullableTimestamps" => {
            &[("created_at", "timestamp"), ("updated_at", "timestamp")]
        }
        "softDeletes" => &[("deleted_at", "timestamp")],
        "rememberToken" => &[("remember_token", "string")],
        _ => &[],
    }
}

fn apply_column(migration: &mut Migration, caps: &Captures) {
    let helper = &caps["helper"];
    let chain = chain_calls(caps.name("chain").map_or("", |m| m.as_str()));

    let Some(name) = caps.name("name").map(|m| m.as_str().to_string()) else {
        for (name, column_type) in implicit_columns(helper) {
            migration.columns.push(Column {
                name: name.to_string(),
                column_type: column_type.to_string(),
                nullable: *name != "id",
                primary: *name == "id",
                ..Default::default()
            });
        }
        return;
    };

    match helper {
        "index" | "unique" | "primary" => {
            migration.indexes.push(MigrationIndex {
                kind: helper.to_string(),
                columns: vec![name],
            });
        }
        "foreign" => {
            let reference = reference_from_chain(&name, &chain);
            if let Some(col) = migration.columns.iter_mut().find(|c| c.name == name) {
                col.references = reference;
            }
        }
        "dropColumn" | "renameColumn" | "dropForeign" | "dropIndex" | "dropUnique" => {}
        _ => {
            let mut column = Column {
                name: name.clone(),
                column_type: helper.to_string(),
                ..Default::default()
            };
            for (call, args) in &chain {
                column.modifiers.push(format!("{}({})", call, args));
                match call.as_str() {
                    "nullable" => column.nullable = true,
                    "unique" => column.unique = true,
                    "primary" => column.primary = true,
                    "default" => column.default = Some(trim_item(args).to_string()),
                    _ => {}
                }
            }
            column.references = reference_from_chain(&name, &chain);
            migration.columns.push(column);
        }
    }
}

/// Foreign reference declared through `constrained()` or `references()->on()`.
fn reference_from_chain(column: &str, chain: &[(String, String)]) -> Option<ForeignReference> {
    let mut reference: Option<ForeignReference> = None;
    for (call, args) in chain {
        let arg = trim_item(args.split(',').next().unwrap_or_default()).to_string();
        match call.as_str() {
            "constrained" => {
                let table = if arg.is_empty() {
                    guess_table(column)
                } else {
                    arg
                };
                let r = reference.get_or_insert_with(Default::default);
                r.table = table;
                if r.column.is_empty() {
                    r.column = "id".to_string();
                }
            }
            "references" => reference.get_or_insert_with(Default::default).column = arg,
            "on" => reference.get_or_insert_with(Default::default).table = arg,
            "onDelete" => {
                if let Some(r) = reference.as_mut() {
                    r.on_delete = Some(arg.to_lowercase());
                }
            }
            "onUpdate" => {
                if let Some(r) = reference.as_mut() {
                    r.on_update = Some(arg.to_lowercase());
                }
            }
            "cascadeOnDelete" => {
                if let Some(r) = reference.as_mut() {
                    r.on_delete = Some("cascade".to_string());
                }
            }
            "nullOnDelete" => {
                if let Some(r) = reference.as_mut() {
                    r.on_delete = Some("set null".to_string());
                }
            }
            "cascadeOnUpdate" => {
                if let Some(r) = reference.as_mut() {
                    r.on_update = Some("cascade".to_string());
                }
            }
            _ => {}
        }
    }
    reference.filter(|r| !r.table.is_empty())
}

/// `user_id` → `users`, following the framework's naming convention.
fn guess_table(column: &str) -> String {
    let base = column.strip_suffix("_id").unwrap_or(column);
    if base.ends_with('s') {
        base.to_string()
    } else if let Some(stem) = base.strip_suffix('y') {
        format!("{}ies", stem)
    } else {
        format!("{}s", base)
    }
}

pub fn provider_rules() -> Result<RuleSet<Provider>> {
    Ok(RuleSet::new(vec![
        Rule::<Provider>::first(
            "extends",
            r"class\s+\w+\s+extends\s+\\?(?P<parent>[\w\\]+)",
            |p, caps| p.parent = Some(class_name(&caps["parent"])),
        )?,
        Rule::<Provider>::first(
            "deferred",
            r"class\s+\w+[^{]*\bimplements\b[^{]*\bDeferrableProvider\b",
            |p, _| p.deferred = true,
        )?,
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn model(src: &str) -> Model {
        let mut m = Model::default();
        model_rules().unwrap().apply(&mut m, src);
        m
    }

    #[test]
    fn table_rule() {
        assert_eq!(model("protected $table = 'people';").table.as_deref(), Some("people"));
        assert_eq!(model("$table = 'people';").table, None);
    }

    #[test]
    fn fillable_block_tolerates_layout() {
        let m = model("protected $fillable = [\n    'name',\n    \"email\" ,\n    'password',\n];");
        assert_eq!(m.fillable, vec!["name", "email", "password"]);
    }

    #[test]
    fn hidden_and_casts() {
        let m = model(
            "protected $hidden = ['password', 'remember_token'];\nprotected $casts = [\n 'email_verified_at' => 'datetime',\n 'status' => Status::class,\n];",
        );
        assert_eq!(m.hidden, vec!["password", "remember_token"]);
        assert_eq!(m.casts.len(), 2);
        assert_eq!(m.casts[0].cast_type, "datetime");
        assert_eq!(m.casts[1].cast_type, "Status");
    }

    #[test]
    fn relationships_with_keys_and_pivot() {
        let m = model(
            "public function posts(): HasMany\n{\n    return $this->hasMany(Post::class, 'author_id');\n}\npublic function roles()\n{\n    return $this->belongsToMany(\\App\\Models\\Role::class, 'role_user', 'user_id', 'role_id');\n}\npublic function team() { return $this->belongsTo('App\\Models\\Team'); }",
        );
        assert_eq!(m.relationships.len(), 3);
        let posts = &m.relationships[0];
        assert_eq!(posts.kind, RelationshipType::HasMany);
        assert_eq!(posts.related_model, "Post");
        assert_eq!(posts.foreign_key.as_deref(), Some("author_id"));
        let roles = &m.relationships[1];
        assert_eq!(roles.kind, RelationshipType::BelongsToMany);
        assert_eq!(roles.related_model, "Role");
        assert_eq!(roles.pivot_table.as_deref(), Some("role_user"));
        assert_eq!(roles.local_key.as_deref(), Some("role_id"));
        assert_eq!(m.relationships[2].related_model, "Team");
    }

    #[test]
    fn controller_methods_and_imports() {
        let mut c = Controller::default();
        controller_rules().unwrap().apply(
            &mut c,
            "use App\\Models\\User;\nclass UserController extends Controller {\n public function __construct() { $this->middleware('auth'); }\n public function show(Request $request, int $id): JsonResponse {}\n private function helper() {}\n}",
        );
        assert_eq!(c.methods.len(), 1);
        assert_eq!(c.methods[0].name, "show");
        assert_eq!(c.methods[0].parameters, vec!["Request $request", "int $id"]);
        assert_eq!(c.methods[0].return_type.as_deref(), Some("JsonResponse"));
        assert_eq!(c.middleware, vec!["auth"]);
        assert_eq!(c.models, vec!["User"]);
    }

    #[test]
    fn route_action_forms() {
        let mut routes = Vec::new();
        route_rules().unwrap().apply(
            &mut routes,
            "Route::get('/users', [UserController::class, 'index'])->name('users.index')->middleware(['auth', 'verified']);\nRoute::post(\"/users\", 'UserController@store');\nRoute::get('/health', HealthController::class);\nRoute::get('/about', function () { return view('about'); });",
        );
        assert_eq!(routes.len(), 3);
        assert_eq!(routes[0].method, "GET");
        assert_eq!(routes[0].controller.as_deref(), Some("UserController"));
        assert_eq!(routes[0].action.as_deref(), Some("index"));
        assert_eq!(routes[0].name.as_deref(), Some("users.index"));
        assert_eq!(routes[0].middleware, vec!["auth", "verified"]);
        assert_eq!(routes[1].action.as_deref(), Some("store"));
        assert_eq!(routes[2].action.as_deref(), Some("__invoke"));
    }

    #[test]
    fn migration_columns_and_modifiers() {
        let mut m = Migration::default();
        migration_rules().unwrap().apply(
            &mut m,
            "Schema::create('orders', function (Blueprint $table) {\n    $table->id();\n    $table->foreignId('customer_id')->constrained()->onDelete('cascade');\n    $table->decimal('total', 8, 2)->default(0);\n    $table->string('note')->nullable();\n    $table->unique(['customer_id', 'total']);\n    $table->timestamps();\n});",
        );
        assert_eq!(m.table, "orders");
        let names: Vec<&str> = m.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["id", "customer_id", "total", "note", "created_at", "updated_at"]
        );
        assert!(m.columns[0].primary);
        let fk = m.columns[1].references.as_ref().unwrap();
        assert_eq!(fk.table, "customers");
        assert_eq!(fk.column, "id");
        assert_eq!(fk.on_delete.as_deref(), Some("cascade"));
        assert_eq!(m.columns[2].default.as_deref(), Some("0"));
        assert!(m.columns[3].nullable);
        assert_eq!(m.indexes[0].columns, vec!["customer_id", "total"]);
    }

    #[test]
    fn explicit_foreign_key_attaches_to_column() {
        let mut m = Migration::default();
        migration_rules().unwrap().apply(
            &mut m,
            "$table->unsignedBigInteger('team_id');\n$table->foreign('team_id')->references('id')->on('teams');",
        );
        assert_eq!(m.columns.len(), 1);
        assert_eq!(m.columns[0].references.as_ref().unwrap().table, "teams");
    }

    #[test]
    fn provider_parent_and_deferral() {
        let mut p = Provider::default();
        provider_rules().unwrap().apply(
            &mut p,
            "class RiakServiceProvider extends ServiceProvider implements DeferrableProvider\n{",
        );
        assert_eq!(p.parent.as_deref(), Some("ServiceProvider"));
        assert!(p.deferred);
    }

    #[test]
    fn table_names_follow_convention() {
        assert_eq!(guess_table("user_id"), "users");
        assert_eq!(guess_table("category_id"), "categories");
    }
}
