//! 应用编排层
//!
//! 持有配置、HTTP 客户端和报告仓库，把命令行命令分派给 API / 服务 / 仓库，
//! 并负责在退出（或 Ctrl-C）时销毁仓库、停止所有轮询。

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::api;
use crate::cli::Command;
use crate::config::Config;
use crate::infrastructure::ApiClient;
use crate::models::{
    AnalysisReport, AnalysisSubmission, ComparisonRequest, ReportQuery, ReportStatus,
};
use crate::services::ReportService;
use crate::store::{NoticeLevel, ReportStore, RosterStore, ScoreSheet};
use crate::utils::logging;

/// 应用主结构
pub struct App {
    config: Config,
    client: ApiClient,
    reports: ReportStore,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        if let Some(path) = &config.output_log_file {
            logging::init_log_file(path).with_context(|| format!("无法写入日志文件: {}", path))?;
        }
        logging::log_startup(&config.api_base_url);

        let client = ApiClient::new(&config).context("无法创建 HTTP 客户端")?;
        let service = ReportService::new(client.clone(), &config);

        Ok(Self {
            config,
            client,
            reports: ReportStore::new(service),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 执行一条命令，结束时销毁报告仓库
    pub async fn run(self, command: Command) -> Result<()> {
        let result = self.dispatch(command).await;
        self.reports.teardown();
        result
    }

    async fn dispatch(&self, command: Command) -> Result<()> {
        match command {
            Command::Reports {
                page,
                page_size,
                query,
                status,
            } => {
                let query = ReportQuery {
                    page,
                    page_size,
                    query,
                    status: status.map(ReportStatus::from),
                };
                let page = self.reports.load_page(&query).await?;
                println!(
                    "第 {}/{} 页，共 {} 个报告",
                    page.page,
                    page.total_pages().max(1),
                    page.total
                );
                for report in &page.items {
                    print_report_line(report);
                }
            }
            Command::Report { id } => {
                let report = self.reports.refresh(id).await?;
                print_report_detail(&report);
            }
            Command::Submit {
                exam_id,
                name,
                level,
                ids,
                no_wait,
            } => {
                let submission = AnalysisSubmission::new(exam_id, name, level.scope(ids));
                if no_wait {
                    let accepted = api::submit_analysis(&self.client, &submission).await?;
                    println!("{} 报告ID: {}", accepted.message, accepted.report_id);
                } else {
                    let id = self.reports.submit(&submission).await?;
                    self.wait_and_report(id).await?;
                }
            }
            Command::Wait { id } => {
                self.reports.track(id);
                self.wait_and_report(id).await?;
            }
            Command::Ai { id } => {
                self.reports.refresh(id).await?;
                self.reports.request_ai(id).await?;
                self.wait_for_sessions().await;
                self.print_notices();
                let report = self.reports.report(id).context("报告不在缓存中")?;
                match report.ai_analysis_text() {
                    Some(text) => println!("\n{}", text),
                    None => anyhow::bail!("报告 #{} 没有可用的 AI 分析", id),
                }
            }
            Command::Retry { id } => {
                self.reports.retry(id).await?;
                self.wait_and_report(id).await?;
            }
            Command::Delete { id } => {
                self.reports.delete(id).await?;
                println!("报告 #{} 已删除", id);
            }
            Command::Compare { ids, name } => {
                let request = ComparisonRequest {
                    report_ids: ids,
                    report_name: name,
                };
                let id = self.reports.compare(&request).await?;
                self.wait_and_report(id).await?;
            }
            Command::Exams => {
                for exam in api::list_exams(&self.client).await? {
                    println!(
                        "#{:<4} {} {} [{}]",
                        exam.id,
                        exam.exam_date,
                        exam.name,
                        exam.status.label()
                    );
                }
            }
            Command::Finalize { exam_id } => {
                let exam = api::finalize_exam(&self.client, exam_id).await?;
                println!("考试 '{}' 状态: {}", exam.name, exam.status.label());
            }
            Command::Unlock { exam_id } => {
                let exam = api::unlock_exam(&self.client, exam_id).await?;
                println!("考试 '{}' 状态: {}", exam.name, exam.status.label());
            }
            Command::Tree => {
                let mut roster = RosterStore::new(self.client.clone());
                for grade in roster.load_tree().await? {
                    println!("{} ({} 人)", grade.name, grade.student_count());
                    for class in &grade.classes {
                        println!(
                            "  └ #{} {} ({} 级, {} 人)",
                            class.id, class.name, class.enrollment_year, class.student_count
                        );
                    }
                }
            }
            Command::Scores { exam_id, class_id } => {
                let sheet = ScoreSheet::load(self.client.clone(), exam_id, class_id).await?;
                print_score_sheet(&sheet);
            }
        }
        Ok(())
    }

    /// 等待轮询结束，输出提示，最后打印报告
    async fn wait_and_report(&self, id: i64) -> Result<()> {
        info!("⏳ 正在等待报告 #{} ...", id);
        self.wait_for_sessions().await;
        let failed = self.print_notices();

        if let Some(report) = self.reports.report(id) {
            print_report_detail(&report);
        }
        if failed {
            anyhow::bail!("报告 #{} 未能成功完成", id);
        }
        Ok(())
    }

    /// 等待所有轮询会话结束；Ctrl-C 时立即停止
    async fn wait_for_sessions(&self) {
        tokio::select! {
            _ = self.reports.wait_idle() => {}
            _ = tokio::signal::ctrl_c() => {
                warn!("收到中断信号，停止轮询");
                self.reports.teardown();
            }
        }
    }

    /// 输出所有提示，返回是否存在错误
    fn print_notices(&self) -> bool {
        let mut failed = false;
        for notice in self.reports.take_notices() {
            match notice.level {
                NoticeLevel::Success => println!("✅ {}", notice.message),
                NoticeLevel::Error => {
                    failed = true;
                    error!("{}", notice.message);
                }
            }
        }
        failed
    }
}

fn print_report_line(report: &AnalysisReport) {
    println!(
        "#{:<5} {:<8} AI:{:<12} {} {}",
        report.id,
        report.status.label(),
        report.ai_analysis_status.as_str(),
        report.created_at.format("%Y-%m-%d %H:%M"),
        logging::truncate_text(&report.report_name, 40)
    );
}

fn print_report_detail(report: &AnalysisReport) {
    println!("{}", "=".repeat(60));
    println!("报告 #{}: {}", report.id, report.report_name);
    println!("状态: {}  AI 分析: {}", report.status.label(), report.ai_analysis_status);
    if let Some(exam) = &report.exam {
        println!("考试: {} ({})", exam.name, exam.exam_date);
    }
    if let Some(message) = &report.error_message {
        println!("错误: {}", message);
    }
    if let Some(data) = &report.full_report_data {
        let keys: Vec<&str> = data.keys().map(String::as_str).collect();
        println!("结果字段: {}", keys.join(", "));
    }
    println!("{}", "=".repeat(60));
}

fn print_score_sheet(sheet: &ScoreSheet) {
    let subjects = sheet.subjects();
    let header: Vec<&str> = subjects.iter().map(|s| s.name.as_str()).collect();
    println!("学生ID\t{}\t总分", header.join("\t"));
    for row in sheet.rows() {
        let cells: Vec<String> = subjects
            .iter()
            .map(|s| row.score(&s.name).map_or_else(|| "-".to_string(), |v| v.to_string()))
            .collect();
        println!("{}\t{}\t{}", row.student_id, cells.join("\t"), row.total());
    }
    let (filled, total) = sheet.completion();
    println!("录入进度: {}/{}", filled, total);
}
