use std::{fs, path::Path};

use chrono::NaiveDate;

use crate::{
    allocation::{AllocationReport, Confirmation, Outcome},
    errors::PlannerError,
    export::{self, csv::weeks_to_csv, Table, TableColumn},
    planner::{parse_number, parse_weeks, PlanDocument, ScopeItem},
    utils::{
        build_info,
        persistence::{load_from_path, save_to_path},
    },
};

use super::{
    context::{CliMode, CommandError, CommandResult, ShellContext},
    output,
    registry::{CommandEntry, CommandRegistry},
};

pub(crate) fn registry() -> CommandRegistry {
    let mut registry = CommandRegistry::default();
    registry.register(CommandEntry::new(
        "help",
        "Show available commands",
        "help [command]",
        cmd_help,
    ));
    registry.register(CommandEntry::new(
        "new",
        "Start a blank plan",
        "new [name]",
        cmd_new,
    ));
    registry.register(CommandEntry::new(
        "settings",
        "Show project settings and toggles",
        "settings",
        cmd_settings,
    ));
    registry.register(CommandEntry::new(
        "set",
        "Change a project setting",
        "set <weeks|markup|hst|holdback|deposit|credit> <value>",
        cmd_set,
    ));
    registry.register(CommandEntry::new(
        "toggle",
        "Enable or disable deposit credit, holdback or HST",
        "toggle <deposit|holdback|hst> [on|off]",
        cmd_toggle,
    ));
    registry.register(CommandEntry::new(
        "month",
        "Edit the month calendar",
        "month <list|add <label> <weeks>|set <n> <weeks>|rename <n> <label>|remove <n>|auto <YYYY-MM-DD>>",
        cmd_month,
    ));
    registry.register(CommandEntry::new(
        "item",
        "Edit scope items",
        "item <list|add <code> <name> <base> [start] [dur]|remove <n>|time <n> <start> <dur>|spread <n> [on|off]|pd <n> <pct> [week]>",
        cmd_item,
    ));
    registry.register(CommandEntry::new(
        "compute",
        "Allocate the plan and show the monthly cash flow",
        "compute [--force]",
        cmd_compute,
    ));
    registry.register(CommandEntry::new(
        "weeks",
        "Show the weekly allocation",
        "weeks",
        cmd_weeks,
    ));
    registry.register(CommandEntry::new(
        "cap",
        "Cap overrunning scope items to the project end",
        "cap",
        cmd_cap,
    ));
    registry.register(CommandEntry::new(
        "load",
        "Load a plan from a JSON file",
        "load <path>",
        cmd_load,
    ));
    registry.register(CommandEntry::new(
        "save",
        "Save the plan to a JSON file",
        "save <path>",
        cmd_save,
    ));
    registry.register(CommandEntry::new(
        "open",
        "Open a named plan from the plan store",
        "open [name]",
        cmd_open,
    ));
    registry.register(CommandEntry::new(
        "store",
        "Save the plan into the plan store",
        "store [name]",
        cmd_store,
    ));
    registry.register(CommandEntry::new(
        "plans",
        "List stored plans",
        "plans",
        cmd_plans,
    ));
    registry.register(CommandEntry::new(
        "backups",
        "List backups of a stored plan",
        "backups [name]",
        cmd_backups,
    ));
    registry.register(CommandEntry::new(
        "restore",
        "Restore a stored plan from a backup",
        "restore <name> <backup-file>",
        cmd_restore,
    ));
    registry.register(CommandEntry::new(
        "export",
        "Write the cash flow to a file",
        "export <csv|html|weeks> <path>",
        cmd_export,
    ));
    registry.register(CommandEntry::new(
        "config",
        "Show or change CLI preferences",
        "config [<locale|currency|recompute_delay_ms|backup_retention> <value>]",
        cmd_config,
    ));
    registry.register(CommandEntry::new(
        "version",
        "Show build information",
        "version",
        cmd_version,
    ));
    registry.register(CommandEntry::new(
        "exit",
        "Leave the shell",
        "exit",
        cmd_exit,
    ));
    registry.alias("quit", "exit");
    registry.alias("calc", "compute");
    registry
}

fn usage_error(usage: &str) -> CommandError {
    CommandError::InvalidArguments(format!("usage: {usage}"))
}

fn parse_index(raw: &str, what: &str) -> Result<usize, CommandError> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(CommandError::InvalidArguments(format!(
            "`{raw}` is not a valid {what} number"
        ))),
    }
}

fn parse_switch(raw: Option<&&str>) -> Result<bool, CommandError> {
    match raw.map(|value| value.to_ascii_lowercase()) {
        None => Ok(true),
        Some(value) => match value.as_str() {
            "on" | "yes" | "true" | "1" => Ok(true),
            "off" | "no" | "false" | "0" => Ok(false),
            _ => Err(CommandError::InvalidArguments(format!(
                "expected on/off, got `{value}`"
            ))),
        },
    }
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

/// Latest outcome, recomputing first when edits are pending.
fn current_outcome(ctx: &mut ShellContext) -> Result<Outcome, CommandError> {
    if !ctx.state.is_dirty() {
        if let Some(outcome) = ctx.state.last_outcome() {
            return Ok(outcome.clone());
        }
    }
    Ok(ctx.state.recompute()?.clone())
}

fn current_report(ctx: &mut ShellContext) -> Result<AllocationReport, CommandError> {
    let outcome = current_outcome(ctx)?;
    if !outcome.is_ready() {
        output::warning("Plan needs confirmation; using the unconfirmed preview.");
    }
    Ok(outcome.report().clone())
}

fn cmd_help(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    let registry = ctx.registry();
    if let Some(name) = args.first() {
        return match registry.get(&name.to_lowercase()) {
            Some(entry) => {
                output::info(format!("{} - {}", entry.name, entry.description));
                output::info(format!("usage: {}", entry.usage));
                Ok(())
            }
            None => Err(CommandError::InvalidArguments(format!(
                "no such command `{name}`"
            ))),
        };
    }
    output::section("Commands");
    let width = registry.list().map(|entry| entry.name.len()).max().unwrap_or(0);
    for entry in registry.list() {
        output::info(format!("  {:<width$}  {}", entry.name, entry.description));
    }
    Ok(())
}

fn cmd_new(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    ctx.state.replace_document(PlanDocument::default());
    ctx.plan_name = args.first().map(|name| name.to_string());
    output::success(format!(
        "New plan created ({} project weeks).",
        ctx.state.settings().project_weeks
    ));
    Ok(())
}

fn cmd_settings(ctx: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let settings = ctx.state.settings();
    let toggles = ctx.state.toggles();
    let money = &ctx.money;
    let mut table = Table::new(vec![TableColumn::left("Setting"), TableColumn::right("Value")]);
    let rows = [
        ("Project weeks", settings.project_weeks.to_string()),
        ("Markup", money.percent(settings.markup_pct)),
        ("HST", money.percent(settings.hst_pct)),
        ("Holdback", money.percent(settings.holdback_pct)),
        ("Deposit", money.percent(settings.deposit_pct)),
        ("Deposit credit", money.percent(settings.deposit_credit_pct)),
        ("Apply deposit credit", enabled(toggles.deposit_credit).to_string()),
        ("Apply holdback", enabled(toggles.holdback).to_string()),
        ("Apply HST", enabled(toggles.hst).to_string()),
    ];
    for (label, value) in rows {
        table.push_row(vec![label.to_string(), value]);
    }
    output::info(table.render());
    Ok(())
}

fn cmd_set(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [key, value] = args else {
        return Err(usage_error("set <key> <value>"));
    };
    ctx.state.set_setting(&key.to_lowercase(), value)?;
    output::success(format!("Updated `{key}`."));
    Ok(())
}

fn cmd_toggle(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some(name) = args.first() else {
        return Err(usage_error("toggle <deposit|holdback|hst> [on|off]"));
    };
    let on = parse_switch(args.get(1))?;
    ctx.state.set_toggle(&name.to_lowercase(), on)?;
    output::success(format!("`{name}` is now {}.", enabled(on)));
    Ok(())
}

fn cmd_month(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args {
        [] | ["list"] => list_months(ctx),
        ["add", label, weeks] => {
            ctx.state.add_month(*label, parse_weeks(weeks));
            output::success(format!("Added month `{label}`."));
            list_months(ctx)
        }
        ["set", index, weeks] => {
            ctx.state
                .set_month_weeks(parse_index(index, "month")?, parse_weeks(weeks))?;
            list_months(ctx)
        }
        ["rename", index, label] => {
            ctx.state.rename_month(parse_index(index, "month")?, *label)?;
            list_months(ctx)
        }
        ["remove", index] => {
            ctx.state.remove_month(parse_index(index, "month")?)?;
            list_months(ctx)
        }
        ["auto", rest @ ..] => {
            let start = match rest.first() {
                Some(raw) => Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                    CommandError::InvalidArguments(format!("`{raw}` is not a YYYY-MM-DD date"))
                })?),
                None => None,
            };
            ctx.state.auto_generate_months(start)?;
            list_months(ctx)
        }
        _ => Err(usage_error(
            "month <list|add <label> <weeks>|set <n> <weeks>|rename <n> <label>|remove <n>|auto <YYYY-MM-DD>>",
        )),
    }
}

fn list_months(ctx: &mut ShellContext) -> CommandResult {
    let months = ctx.state.months();
    if months.is_empty() {
        output::info("No months defined.");
        return Ok(());
    }
    let mut table = Table::new(vec![
        TableColumn::right("#"),
        TableColumn::left("Month"),
        TableColumn::right("Weeks"),
        TableColumn::right("Start"),
        TableColumn::right("End"),
    ]);
    for month in months.months() {
        let (start, end) = if month.is_active() {
            (month.start.to_string(), month.end.to_string())
        } else {
            ("-".into(), "-".into())
        };
        table.push_row(vec![
            month.index.to_string(),
            month.label.clone(),
            month.weeks.to_string(),
            start,
            end,
        ]);
    }
    output::info(table.render());
    let project_weeks = ctx.state.settings().project_weeks;
    if months.total_weeks() != project_weeks {
        output::warning(format!(
            "Months cover {} weeks but the project runs {project_weeks}.",
            months.total_weeks()
        ));
    }
    Ok(())
}

fn cmd_item(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args {
        [] | ["list"] => list_items(ctx),
        ["add", code, name, base, rest @ ..] => {
            let mut item = ScopeItem::new(*code, *name, parse_number(base));
            if let Some(start) = rest.first() {
                item.startwk = parse_weeks(start);
            }
            if let Some(dur) = rest.get(1) {
                item.dur = parse_weeks(dur);
            }
            let index = ctx.state.add_item(item);
            output::success(format!("Added item #{}.", index + 1));
            Ok(())
        }
        ["remove", index] => {
            let removed = ctx.state.remove_item(parse_index(index, "item")? - 1)?;
            output::success(format!("Removed {}.", removed.label()));
            Ok(())
        }
        ["time", index, start, dur] => {
            let (start, dur) = (parse_weeks(start), parse_weeks(dur));
            ctx.state.update_item(parse_index(index, "item")? - 1, |item| {
                item.startwk = start;
                item.dur = dur;
            })?;
            list_items(ctx)
        }
        ["spread", index, rest @ ..] => {
            let on = parse_switch(rest.first())?;
            ctx.state
                .update_item(parse_index(index, "item")? - 1, |item| item.spread = on)?;
            list_items(ctx)
        }
        ["pd", index, pct, rest @ ..] => {
            let pct = parse_number(pct);
            let week = rest.first().map(|raw| parse_weeks(raw));
            ctx.state.update_item(parse_index(index, "item")? - 1, |item| {
                item.pdpct = pct;
                if let Some(week) = week {
                    item.pdweek = week;
                }
            })?;
            list_items(ctx)
        }
        _ => Err(usage_error(
            "item <list|add <code> <name> <base> [start] [dur]|remove <n>|time <n> <start> <dur>|spread <n> [on|off]|pd <n> <pct> [week]>",
        )),
    }
}

fn list_items(ctx: &mut ShellContext) -> CommandResult {
    let scope = ctx.state.scope();
    if scope.is_empty() {
        output::info("No scope items.");
        return Ok(());
    }
    let mut table = Table::new(vec![
        TableColumn::right("#"),
        TableColumn::left("Code"),
        TableColumn::left("Name").max_width(28),
        TableColumn::right("Base"),
        TableColumn::right("Start"),
        TableColumn::right("Dur"),
        TableColumn::left("Spread"),
        TableColumn::right("PD"),
        TableColumn::right("PD Wk"),
    ]);
    for (idx, item) in scope.iter().enumerate() {
        table.push_row(vec![
            (idx + 1).to_string(),
            item.code.clone(),
            item.name.clone(),
            ctx.money.money(item.base),
            item.startwk.to_string(),
            item.dur.to_string(),
            enabled(item.spread).to_string(),
            ctx.money.percent(item.deposit_fraction()),
            item.pdweek.to_string(),
        ]);
    }
    output::info(table.render());
    Ok(())
}

fn describe_confirmation(confirmation: &Confirmation) {
    if !confirmation.overruns.is_empty() {
        output::warning(format!(
            "{} scope item(s) run past the project end:",
            confirmation.overruns.len()
        ));
        for overrun in &confirmation.overruns {
            output::info(format!(
                "  #{} {} {}: weeks {}-{}",
                overrun.index + 1,
                overrun.code,
                overrun.name,
                overrun.from,
                overrun.to
            ));
        }
    }
    if let Some(mismatch) = confirmation.week_mismatch {
        output::warning(format!(
            "Months add up to {} weeks but the project runs {}.",
            mismatch.calendar_weeks, mismatch.project_weeks
        ));
    }
}

fn cmd_compute(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    let force = args.iter().any(|arg| *arg == "--force" || *arg == "-f");
    let mut outcome = ctx.state.recompute()?.clone();
    if let Outcome::RequiresConfirmation(confirmation) = outcome {
        describe_confirmation(&confirmation);
        if !confirmation.overruns.is_empty()
            && ctx.confirm("Cap overrunning items to the project end?", false)?
        {
            let changed = ctx.state.confirm_overruns()?;
            output::success(format!("Capped {changed} item(s)."));
        }
        if confirmation.week_mismatch.is_some()
            && (force || ctx.confirm("Proceed with the current months anyway?", false)?)
        {
            ctx.state.accept_week_mismatch()?;
        }
        outcome = current_outcome(ctx)?;
    }
    show_outcome(ctx, &outcome);
    Ok(())
}

fn show_outcome(ctx: &ShellContext, outcome: &Outcome) {
    if let Outcome::RequiresConfirmation(_) = outcome {
        let next = match ctx.mode {
            CliMode::Script => "run `cap` or `compute --force`",
            CliMode::Interactive => "run `compute` again to confirm",
        };
        output::warning(format!("Showing an unconfirmed preview; {next}."));
    }
    let report = outcome.report();
    output::section("Cash flow");
    output::info(export::cash_flow_table(report, &ctx.money).render());
    let money = &ctx.money;
    output::info(format!(
        "Contract {} (base {} + markup {})",
        money.money(report.totals.contract_total),
        money.money(report.totals.base_total),
        money.money(report.totals.markup_amount)
    ));
    output::info(format!(
        "Deposit {} collected, floor {}, {} remaining",
        money.money(report.deposit.deposit_pre),
        money.money(report.deposit.deposit_floor),
        money.money(report.deposit.remaining)
    ));
    if report.drift != 0.0 {
        output::info(format!("Rounding drift {} applied", money.money(report.drift)));
    }
    if report.deposit.nearing_floor {
        output::warning("Deposit credit is close to the deposit floor.");
    }
}

fn cmd_weeks(ctx: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let report = current_report(ctx)?;
    output::info(export::week_table(&report, &ctx.money).render());
    Ok(())
}

fn cmd_cap(ctx: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let changed = ctx.state.confirm_overruns()?;
    if changed == 0 {
        output::info("No scope items overrun the project.");
    } else {
        output::success(format!("Capped {changed} item(s)."));
    }
    Ok(())
}

fn cmd_load(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [path] = args else {
        return Err(usage_error("load <path>"));
    };
    let path = Path::new(path);
    let document = load_from_path(path)?;
    ctx.state.replace_document(document);
    ctx.plan_name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string);
    output::success(format!("Plan loaded from {}.", path.display()));
    Ok(())
}

fn cmd_save(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [path] = args else {
        return Err(usage_error("save <path>"));
    };
    save_to_path(ctx.state.document(), Path::new(path))?;
    output::success(format!("Plan saved to {path}."));
    Ok(())
}

fn remember_plan(ctx: &mut ShellContext, name: &str) -> CommandResult {
    ctx.plan_name = Some(name.to_string());
    ctx.config.last_opened_plan = Some(name.to_string());
    ctx.config_manager.save(&ctx.config)?;
    Ok(())
}

fn cmd_open(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    let name = match args.first() {
        Some(name) => name.to_string(),
        None => ctx
            .config
            .last_opened_plan
            .clone()
            .ok_or_else(|| usage_error("open <name>"))?,
    };
    let document = ctx.storage.load_named(&name)?;
    ctx.state.replace_document(document);
    remember_plan(ctx, &name)?;
    output::success(format!("Opened plan `{name}`."));
    Ok(())
}

fn cmd_store(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    let name = match args.first() {
        Some(name) => name.to_string(),
        None => ctx
            .plan_name
            .clone()
            .ok_or_else(|| usage_error("store <name>"))?,
    };
    let path = ctx.storage.save_named(ctx.state.document(), &name)?;
    remember_plan(ctx, &name)?;
    output::success(format!("Plan `{name}` stored at {}.", path.display()));
    Ok(())
}

fn cmd_plans(ctx: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let plans = ctx.storage.list_plans()?;
    if plans.is_empty() {
        output::info("No stored plans.");
    }
    for name in plans {
        output::info(format!("  {name}"));
    }
    Ok(())
}

fn cmd_backups(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    let name = match args.first() {
        Some(name) => name.to_string(),
        None => ctx
            .plan_name
            .clone()
            .ok_or_else(|| usage_error("backups <name>"))?,
    };
    let backups = ctx.storage.list_backups(&name)?;
    if backups.is_empty() {
        output::info(format!("No backups for `{name}`."));
    }
    for backup in backups {
        output::info(format!("  {}", backup.file_name));
    }
    Ok(())
}

fn cmd_restore(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [name, file] = args else {
        return Err(usage_error("restore <name> <backup-file>"));
    };
    if !ctx.confirm(&format!("Replace `{name}` with {file}?"), true)? {
        output::info("Restore cancelled.");
        return Ok(());
    }
    let document = ctx.storage.restore_backup(name, file)?;
    ctx.state.replace_document(document);
    remember_plan(ctx, name)?;
    output::success(format!("Restored `{name}` from {file}."));
    Ok(())
}

fn cmd_export(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    let [format, path] = args else {
        return Err(usage_error("export <csv|html|weeks> <path>"));
    };
    let report = current_report(ctx)?;
    let contents = match format.to_lowercase().as_str() {
        "csv" => export::to_csv(&report),
        "weeks" => weeks_to_csv(&report),
        "html" => {
            let title = ctx.plan_name.as_deref().unwrap_or("Payment plan");
            export::to_html(&report, &ctx.money, title)
        }
        other => {
            return Err(CommandError::InvalidArguments(format!(
                "unknown export format `{other}`"
            )))
        }
    };
    fs::write(path, contents).map_err(PlannerError::from)?;
    output::success(format!("Exported {format} to {path}."));
    Ok(())
}

fn cmd_config(ctx: &mut ShellContext, args: &[&str]) -> CommandResult {
    match args {
        [] => {
            let config = &ctx.config;
            output::info(format!("locale              {}", config.locale));
            output::info(format!("currency            {}", config.currency));
            output::info(format!("recompute_delay_ms  {}", config.recompute_delay_ms));
            output::info(format!("backup_retention    {}", config.backup_retention));
            output::info(format!(
                "config file         {}",
                ctx.config_manager.path().display()
            ));
            Ok(())
        }
        [key, value] => {
            ctx.config.set(key, value)?;
            ctx.config_manager.save(&ctx.config)?;
            ctx.money = ctx.config.money_format();
            output::success(format!("Set `{key}`."));
            Ok(())
        }
        _ => Err(usage_error("config [<key> <value>]")),
    }
}

fn cmd_version(_ctx: &mut ShellContext, _args: &[&str]) -> CommandResult {
    output::info(build_info::current().summary());
    Ok(())
}

fn cmd_exit(ctx: &mut ShellContext, _args: &[&str]) -> CommandResult {
    if ctx.mode == CliMode::Interactive && !ctx.confirm_exit()? {
        return Ok(());
    }
    Err(CommandError::ExitRequested)
}
