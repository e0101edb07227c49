use std::sync::Arc;

use crate::ai::{Agent, AgentSetup, Transition};
use crate::env::{Environment, State};
use crate::error::{AgentError, GameplayError, MoveError};
use crate::game::{Color, Move, Outcome, Simulation};

/// A seat is either an agent or a human (`None`).
pub type Seat = Option<Box<dyn Agent>>;

/// Turn bookkeeping shared by every driver: who sits where, which state each
/// agent last decided in, and when agents hear about the results.
pub struct GameSession {
    env: Arc<Environment>,
    simulation: Simulation,
    /// Black seat first, White second.
    seats: [Seat; 2],
    /// State and action of each seat's last move, awaiting its outcome.
    pending: [Option<(State, Move)>; 2],
}

fn seat_index(color: Color) -> usize {
    if color == Color::White {
        1
    } else {
        0
    }
}

impl GameSession {
    pub fn new(env: Arc<Environment>) -> Self {
        let simulation = Simulation::initial(env.size());
        GameSession {
            env,
            simulation,
            seats: [None, None],
            pending: [None, None],
        }
    }

    pub fn env(&self) -> &Arc<Environment> {
        &self.env
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Seat the players and hand each agent the environment view its
    /// capability allows.
    pub fn set_players(&mut self, black: Seat, white: Seat) -> Result<(), AgentError> {
        self.seats = [black, white];
        self.pending = [None, None];
        for agent in self.seats.iter_mut().flatten() {
            let setup = AgentSetup::for_capability(agent.capability(), &self.env);
            agent.initialize(setup)?;
        }
        Ok(())
    }

    pub fn swap_players(&mut self) {
        self.seats.swap(0, 1);
        self.pending = [None, None];
    }

    pub fn player(&self, color: Color) -> Option<&dyn Agent> {
        self.seats[seat_index(color)].as_deref()
    }

    pub fn is_human(&self, color: Color) -> bool {
        self.seats[seat_index(color)].is_none()
    }

    /// Color whose turn it is.
    pub fn decisive_color(&self) -> Color {
        self.simulation.turn()
    }

    /// The current board as seen by the player of `color`.
    pub fn state_for(&self, color: Color) -> State {
        self.env.state_of(self.simulation.board(), color)
    }

    /// Ask the agent to move. `None` when a human has the turn.
    pub fn decide(&mut self) -> Result<Option<Move>, GameplayError> {
        let color = self.decisive_color();
        let state = self.state_for(color);
        match self.seats[seat_index(color)].as_mut() {
            Some(agent) => Ok(Some(agent.get_action(&state)?)),
            None => Ok(None),
        }
    }

    /// Apply a move for the side to move and report results: to both seats
    /// when the game ends, otherwise to the seat that decides next.
    pub fn make_move(&mut self, mv: Move) -> Result<(), GameplayError> {
        let mover = self.decisive_color();
        if self.seats[seat_index(mover)].is_some() {
            self.pending[seat_index(mover)] = Some((self.state_for(mover), mv));
        }

        self.simulation.make_move(mv)?;

        if self.simulation.is_finished() {
            self.notify(Color::Black)?;
            self.notify(Color::White)?;
        } else {
            self.notify(self.decisive_color())?;
        }
        Ok(())
    }

    fn notify(&mut self, color: Color) -> Result<(), AgentError> {
        let idx = seat_index(color);
        let Some((state, action)) = self.pending[idx].take() else {
            return Ok(());
        };
        let next_state = self.state_for(color);
        let transition = Transition {
            state,
            action,
            reward: self.env.reward(&state, action, &next_state),
            next_state,
            done: self.simulation.is_finished(),
        };
        match self.seats[idx].as_mut() {
            Some(agent) => agent.update(&transition),
            None => Ok(()),
        }
    }

    pub fn before_gameplay(&mut self) {
        for agent in self.seats.iter_mut().flatten() {
            agent.before_gameplay();
        }
    }

    pub fn after_gameplay(&mut self) {
        for agent in self.seats.iter_mut().flatten() {
            agent.after_gameplay();
        }
    }

    pub fn outcome(&self) -> Result<Outcome, MoveError> {
        self.simulation.winner()
    }

    /// Back to the starting position with the same players.
    pub fn reset(&mut self) {
        self.simulation.reset();
        self.pending = [None, None];
    }

    /// Release both seats, Black first.
    pub fn dispose(&mut self) -> (Seat, Seat) {
        self.pending = [None, None];
        let [black, white] = std::mem::take(&mut self.seats);
        (black, white)
    }
}
