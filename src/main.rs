use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{ExecutableCommand, QueueableCommand};
use rand::seq::SliceRandom;
use rand::Rng;
use std::io::{self, Stdout, Write};
use std::thread;
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

const DEFAULT_GRID_W: usize = 31;
const DEFAULT_GRID_H: usize = 31;
const DEFAULT_TORCH_RADIUS: u32 = 3;
const DEFAULT_WALK_MS: u64 = 25;
const BUILD_DELAY_MS: u64 = 10;
const WIN_PAUSE_MS: u64 = 1000;
const CELL_W: usize = 2;
const WIN_MESSAGE: &str = "YOU WIN!!!";
const HINT_LINE: &str = "WASD to move  (q to quit)";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum CellKind {
    Wall,
    Passage,
    Goal,
}

#[derive(Clone, Copy)]
struct Cell {
    kind: CellKind,
    visited: bool,
    gen_head: bool,
}

impl Cell {
    fn wall() -> Self {
        Self {
            kind: CellKind::Wall,
            visited: false,
            gen_head: false,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Pos {
    x: usize,
    y: usize,
}

#[derive(Clone, Copy)]
enum Dir {
    Up,
    Down,
    Left,
    Right,
}

impl Dir {
    fn delta(self) -> (isize, isize) {
        match self {
            Dir::Up => (0, -1),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
            Dir::Right => (1, 0),
        }
    }
}

struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Vec<Cell>>,
}

impl Grid {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![vec![Cell::wall(); width]; height],
        }
    }

    fn reset(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.cells = vec![vec![Cell::wall(); width]; height];
    }

    fn get(&self, pos: Pos) -> Cell {
        self.cells[pos.y][pos.x]
    }

    fn get_mut(&mut self, pos: Pos) -> &mut Cell {
        &mut self.cells[pos.y][pos.x]
    }
}

struct Config {
    width: usize,
    height: usize,
    fog: bool,
    torch_radius: u32,
    auto_walk: bool,
    mark_visited: bool,
    show_build: bool,
    walk_ms: u64,
}

impl Config {
    fn from_env() -> Self {
        Self {
            width: odd_dim(env_num("MAZE_WIDTH", DEFAULT_GRID_W)),
            height: odd_dim(env_num("MAZE_HEIGHT", DEFAULT_GRID_H)),
            fog: env_flag("MAZE_FOG", false),
            torch_radius: env_num("MAZE_TORCH", DEFAULT_TORCH_RADIUS),
            auto_walk: env_flag("MAZE_AUTOWALK", true),
            mark_visited: env_flag("MAZE_MARK_VISITED", true),
            show_build: env_flag("MAZE_SHOW_BUILD", false),
            walk_ms: env_num("MAZE_WALK_MS", DEFAULT_WALK_MS),
        }
    }
}

fn env_num<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u8>().ok())
        .map(|v| v != 0)
        .unwrap_or(default)
}

// Carving moves two cells at a time, so the lattice needs odd dimensions.
fn odd_dim(configured: usize) -> usize {
    configured / 2 * 2 + 1
}

struct Game {
    grid: Grid,
    player: Pos,
    message: String,
}

fn main() -> io::Result<()> {
    let mut stdout = io::stdout();
    terminal::enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(Hide)?;

    let result = run(&mut stdout);

    stdout.execute(Show)?;
    stdout.execute(LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;
    result
}

fn run(stdout: &mut Stdout) -> io::Result<()> {
    let cfg = Config::from_env();
    let mut rng = rand::thread_rng();
    let mut game = Game {
        grid: Grid::new(cfg.width, cfg.height),
        player: Pos { x: 0, y: 0 },
        message: String::new(),
    };
    new_maze(&mut game, &cfg, &mut rng, stdout);

    loop {
        render(stdout, &game.grid, game.player, &game.message, &cfg)?;
        match read_input()? {
            Input::Quit => return Ok(()),
            Input::Step(dir) => step_player(&mut game, dir, &cfg, &mut rng, stdout)?,
            Input::Other => {}
        }
    }
}

enum Input {
    Step(Dir),
    Quit,
    Other,
}

fn read_input() -> io::Result<Input> {
    // Drop anything already buffered so the blocking read below reflects a
    // fresh keypress rather than keys mashed during an auto-walk.
    while event::poll(Duration::from_millis(0))? {
        let _ = event::read()?;
    }
    loop {
        if let Event::Key(key) = event::read()? {
            match key.kind {
                KeyEventKind::Press | KeyEventKind::Repeat => match key.code {
                    KeyCode::Char('q') => return Ok(Input::Quit),
                    KeyCode::Char('w') => return Ok(Input::Step(Dir::Up)),
                    KeyCode::Char('s') => return Ok(Input::Step(Dir::Down)),
                    KeyCode::Char('a') => return Ok(Input::Step(Dir::Left)),
                    KeyCode::Char('d') => return Ok(Input::Step(Dir::Right)),
                    _ => return Ok(Input::Other),
                },
                _ => {}
            }
        }
    }
}

fn new_maze(game: &mut Game, cfg: &Config, rng: &mut impl Rng, stdout: &mut Stdout) {
    game.message.clear();
    game.grid.reset(cfg.width, cfg.height);
    let start = random_start(cfg.width, cfg.height, rng);
    game.player = start;
    let goal = generate_maze(&mut game.grid, start, rng, |grid, _| {
        if cfg.show_build {
            let _ = render(stdout, grid, start, "", cfg);
            thread::sleep(Duration::from_millis(BUILD_DELAY_MS));
        }
    });
    game.grid.get_mut(start).visited = true;
    game.grid.get_mut(goal).kind = CellKind::Goal;
}

fn random_start(width: usize, height: usize, rng: &mut impl Rng) -> Pos {
    let lattice_w = width / 2 + 1;
    let lattice_h = height / 2 + 1;
    Pos {
        x: rng.gen_range(0..lattice_w) * 2,
        y: rng.gen_range(0..lattice_h) * 2,
    }
}

fn generate_maze(
    grid: &mut Grid,
    start: Pos,
    rng: &mut impl Rng,
    mut on_carve: impl FnMut(&Grid, Pos),
) -> Pos {
    grid.get_mut(start).kind = CellKind::Passage;
    grid.get_mut(start).gen_head = true;
    on_carve(grid, start);
    grid.get_mut(start).gen_head = false;

    let mut best = start;
    let mut best_dist = 0u32;
    let mut stack = vec![(start, 0u32)];

    while let Some(&(pos, dist)) = stack.last() {
        let mut targets = Vec::new();
        for dir in [Dir::Up, Dir::Down, Dir::Left, Dir::Right] {
            if let Some(next) = offset_by(pos, dir, 2, grid.width, grid.height) {
                if grid.get(next).kind == CellKind::Wall {
                    targets.push(next);
                }
            }
        }
        if targets.is_empty() {
            stack.pop();
            continue;
        }

        let next = *targets.choose(rng).unwrap();
        let wall = Pos {
            x: (pos.x + next.x) / 2,
            y: (pos.y + next.y) / 2,
        };
        grid.get_mut(wall).kind = CellKind::Passage;
        grid.get_mut(next).kind = CellKind::Passage;

        let next_dist = dist + 1;
        // Strictly greater: ties keep the earlier find, so the goal is
        // deterministic for a given random stream.
        if next_dist > best_dist {
            best_dist = next_dist;
            best = next;
        }
        stack.push((next, next_dist));

        grid.get_mut(next).gen_head = true;
        on_carve(grid, next);
        grid.get_mut(next).gen_head = false;
    }

    best
}

fn offset_by(pos: Pos, dir: Dir, steps: isize, width: usize, height: usize) -> Option<Pos> {
    let (dx, dy) = dir.delta();
    let nx = pos.x as isize + dx * steps;
    let ny = pos.y as isize + dy * steps;
    if nx < 0 || ny < 0 || nx >= width as isize || ny >= height as isize {
        return None;
    }
    Some(Pos {
        x: nx as usize,
        y: ny as usize,
    })
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum StepOutcome {
    Blocked,
    Moved,
    Won,
}

fn try_step(grid: &mut Grid, player: &mut Pos, dir: Dir) -> StepOutcome {
    let next = match offset_by(*player, dir, 1, grid.width, grid.height) {
        Some(pos) => pos,
        None => return StepOutcome::Blocked,
    };
    match grid.get(next).kind {
        CellKind::Wall => StepOutcome::Blocked,
        CellKind::Goal => {
            *player = next;
            StepOutcome::Won
        }
        CellKind::Passage => {
            *player = next;
            grid.get_mut(next).visited = true;
            StepOutcome::Moved
        }
    }
}

fn open_neighbor_count(grid: &Grid, pos: Pos) -> usize {
    let mut open = 0;
    for dir in [Dir::Up, Dir::Down, Dir::Left, Dir::Right] {
        if let Some(next) = offset_by(pos, dir, 1, grid.width, grid.height) {
            if grid.get(next).kind != CellKind::Wall {
                open += 1;
            }
        }
    }
    open
}

fn step_player(
    game: &mut Game,
    dir: Dir,
    cfg: &Config,
    rng: &mut impl Rng,
    stdout: &mut Stdout,
) -> io::Result<()> {
    let step_limit = game.grid.width * game.grid.height;
    let mut steps = 0;
    loop {
        match try_step(&mut game.grid, &mut game.player, dir) {
            StepOutcome::Blocked => return Ok(()),
            StepOutcome::Won => return handle_win(game, cfg, rng, stdout),
            StepOutcome::Moved => {}
        }
        // Keep sliding down corridors, stop at the first junction.
        if !cfg.auto_walk {
            return Ok(());
        }
        if open_neighbor_count(&game.grid, game.player) > 2 {
            return Ok(());
        }
        steps += 1;
        if steps >= step_limit {
            return Ok(());
        }
        render(stdout, &game.grid, game.player, &game.message, cfg)?;
        thread::sleep(Duration::from_millis(cfg.walk_ms));
    }
}

fn handle_win(
    game: &mut Game,
    cfg: &Config,
    rng: &mut impl Rng,
    stdout: &mut Stdout,
) -> io::Result<()> {
    game.message = WIN_MESSAGE.to_string();
    render(stdout, &game.grid, game.player, &game.message, cfg)?;
    thread::sleep(Duration::from_millis(WIN_PAUSE_MS));
    new_maze(game, cfg, rng, stdout);
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Glyph {
    Hidden,
    Wall,
    Passage,
    Visited,
    Goal,
    Head,
    Player,
    Text(char),
}

fn compose_frame(grid: &Grid, player: Pos, message: &str, cfg: &Config) -> Vec<Vec<Glyph>> {
    let banner: Vec<char> = message.chars().collect();
    let banner_row = grid.height / 2;
    let banner_off = (grid.width / 2).saturating_sub(banner.len() / 2);

    let mut frame = Vec::with_capacity(grid.height);
    for y in 0..grid.height {
        let mut row = Vec::with_capacity(grid.width);
        for x in 0..grid.width {
            let pos = Pos { x, y };
            if !banner.is_empty()
                && y == banner_row
                && x >= banner_off
                && x - banner_off < banner.len()
            {
                row.push(Glyph::Text(banner[x - banner_off]));
                continue;
            }
            let cell = grid.get(pos);
            if hidden_by_fog(cell, pos, player, cfg) {
                row.push(Glyph::Hidden);
            } else if pos == player {
                row.push(Glyph::Player);
            } else if cell.gen_head {
                row.push(Glyph::Head);
            } else {
                row.push(match cell.kind {
                    CellKind::Wall => Glyph::Wall,
                    CellKind::Goal => Glyph::Goal,
                    CellKind::Passage if cell.visited => Glyph::Visited,
                    CellKind::Passage => Glyph::Passage,
                });
            }
        }
        frame.push(row);
    }
    frame
}

fn hidden_by_fog(cell: Cell, pos: Pos, player: Pos, cfg: &Config) -> bool {
    if !cfg.fog {
        return false;
    }
    if cfg.mark_visited && cell.visited {
        return false;
    }
    let dx = pos.x as i64 - player.x as i64;
    let dy = pos.y as i64 - player.y as i64;
    let r = cfg.torch_radius as i64;
    dx * dx + dy * dy > r * r
}

fn render(
    stdout: &mut Stdout,
    grid: &Grid,
    player: Pos,
    message: &str,
    cfg: &Config,
) -> io::Result<()> {
    let frame = compose_frame(grid, player, message, cfg);
    let needed_w = ((grid.width + 2) * CELL_W) as u16;
    let needed_h = (grid.height + 3) as u16;

    let (term_w, term_h) = terminal::size()?;
    stdout.queue(Clear(ClearType::All))?;
    if term_w < needed_w || term_h < needed_h {
        stdout.queue(MoveTo(0, 0))?;
        let msg = format!(
            "Terminal too small. Need at least {}x{} (cols x rows). Current: {}x{}.",
            needed_w, needed_h, term_w, term_h
        );
        stdout.queue(Print(msg))?;
        stdout.flush()?;
        return Ok(());
    }

    let origin_x = (term_w - needed_w) / 2;
    let origin_y = (term_h - needed_h) / 2 + 1;

    stdout.queue(MoveTo(origin_x, origin_y - 1))?;
    stdout.queue(SetForegroundColor(Color::White))?;
    stdout.queue(Print(HINT_LINE))?;
    stdout.queue(ResetColor)?;

    stdout.queue(MoveTo(origin_x, origin_y))?;
    for _ in 0..grid.width + 2 {
        draw_cell(stdout, Glyph::Wall)?;
    }
    for (y, row) in frame.iter().enumerate() {
        stdout.queue(MoveTo(origin_x, origin_y + 1 + y as u16))?;
        draw_cell(stdout, Glyph::Wall)?;
        for &glyph in row {
            draw_cell(stdout, glyph)?;
        }
        draw_cell(stdout, Glyph::Wall)?;
    }
    stdout.queue(MoveTo(origin_x, origin_y + 1 + grid.height as u16))?;
    for _ in 0..grid.width + 2 {
        draw_cell(stdout, Glyph::Wall)?;
    }

    stdout.flush()?;
    Ok(())
}

fn draw_cell(stdout: &mut Stdout, glyph: Glyph) -> io::Result<()> {
    let (text, color) = match glyph {
        Glyph::Text(c) => {
            stdout.queue(SetForegroundColor(Color::White))?;
            stdout.queue(Print(c))?;
            stdout.queue(Print(' '))?;
            stdout.queue(ResetColor)?;
            return Ok(());
        }
        Glyph::Hidden => ("  ", Color::Reset),
        Glyph::Wall => ("▓▓", Color::Reset),
        Glyph::Passage => ("░░", Color::Reset),
        Glyph::Visited => ("░░", Color::Magenta),
        Glyph::Goal => ("F", Color::Green),
        Glyph::Head => ("██", Color::Yellow),
        Glyph::Player => ("P", Color::Magenta),
    };
    stdout.queue(SetForegroundColor(color))?;
    stdout.queue(Print(text))?;
    let w = UnicodeWidthStr::width(text);
    if w < CELL_W {
        for _ in 0..(CELL_W - w) {
            stdout.queue(Print(' '))?;
        }
    }
    stdout.queue(ResetColor)?;
    Ok(())
}
